// Account records: signup, onboarding, stored résumé.

pub mod handlers;
pub mod store;
