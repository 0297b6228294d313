use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::blog::{is_valid_slug, slugify};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogPostRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view without the HTML body.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogPostSummary {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub excerpt: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlogPostDraft {
    pub slug: Option<String>,
    pub title: String,
    pub author: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl BlogPostDraft {
    /// Trims fields, derives a missing slug from the title and rejects
    /// anything the blog pages cannot render.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.title = self.title.trim().to_string();
        self.author = self.author.trim().to_string();
        self.excerpt = self.excerpt.trim().to_string();
        if self.title.is_empty() {
            return Err("title cannot be empty".to_string());
        }
        if self.author.is_empty() {
            return Err("author cannot be empty".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("content cannot be empty".to_string());
        }

        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slugify(&self.title),
        };
        if !is_valid_slug(&slug) {
            return Err(format!(
                "slug '{slug}' must be lowercase letters, digits and single dashes"
            ));
        }
        self.slug = Some(slug);
        self.image_url = self
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Ok(self)
    }

    /// The slug after [`Self::normalized`]; empty before.
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}
