// AI features: résumé tailoring, cover letters and job-match analysis.
// All model calls go through llm_client; prompt templates live in prompts.rs.

pub mod flows;
pub mod handlers;
pub mod invoker;
pub mod prompts;
