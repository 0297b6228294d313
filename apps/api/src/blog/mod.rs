//! CMS-backed blog: public reads, admin-only writes.

pub mod handlers;
pub mod store;

const MAX_SLUG_LEN: usize = 80;

/// Lowercases, keeps `[a-z0-9]`, and collapses every other run into one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if !c.is_ascii_alphanumeric() {
            pending_dash = true;
            continue;
        }
        let dash = pending_dash && !slug.is_empty();
        if slug.len() + usize::from(dash) + 1 > MAX_SLUG_LEN {
            break;
        }
        if dash {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(c);
    }
    slug
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
