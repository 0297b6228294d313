//! AI flows: prompt-template wrappers around the hosted model with typed,
//! validated outputs.
//!
//! `AppState` holds an `Arc<dyn GenerationBackend>`; the default backend is
//! [`LlmFlows`], tests swap in a mock.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::generation::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, JOB_DETAILS_PROMPT_TEMPLATE,
    JOB_DETAILS_SYSTEM, JOB_MATCH_PROMPT_TEMPLATE, JOB_MATCH_SYSTEM, RESUME_PROMPT_TEMPLATE,
    RESUME_SYSTEM,
};
use crate::llm_client::prompts::{HONESTY_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::quota::Feature;

const MAX_SCORE: u32 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Inputs and outputs
// ────────────────────────────────────────────────────────────────────────────

/// User-supplied text every flow works from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureInput {
    pub resume_text: String,
    pub job_description: String,
}

impl FeatureInput {
    /// Trims both fields and rejects blank ones.
    pub fn validated(self) -> Result<Self, String> {
        let resume_text = self.resume_text.trim().to_string();
        let job_description = self.job_description.trim().to_string();
        if resume_text.is_empty() {
            return Err("resume_text cannot be empty".to_string());
        }
        if job_description.is_empty() {
            return Err("job_description cannot be empty".to_string());
        }
        Ok(Self {
            resume_text,
            job_description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredResume {
    pub tailored_resume: String,
    #[serde(default)]
    pub changes: Vec<String>,
    pub ats_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub cover_letter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchReport {
    pub match_score: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Company / title / location pulled from a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
}

impl JobMetadata {
    /// A job record is only auto-created when both company and title are known.
    pub fn is_trackable(&self) -> bool {
        !self.company.trim().is_empty() && !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedContent {
    Resume(TailoredResume),
    CoverLetter(CoverLetter),
    JobMatch(JobMatchReport),
}

/// Output schemas carry range and presence checks beyond what serde enforces.
pub trait FlowOutput: DeserializeOwned {
    fn validate(&self) -> Result<(), String>;
}

impl FlowOutput for TailoredResume {
    fn validate(&self) -> Result<(), String> {
        if self.tailored_resume.trim().is_empty() {
            return Err("tailored_resume is empty".to_string());
        }
        check_score("ats_score", self.ats_score)
    }
}

impl FlowOutput for CoverLetter {
    fn validate(&self) -> Result<(), String> {
        if self.cover_letter.trim().is_empty() {
            return Err("cover_letter is empty".to_string());
        }
        Ok(())
    }
}

impl FlowOutput for JobMatchReport {
    fn validate(&self) -> Result<(), String> {
        check_score("match_score", self.match_score)
    }
}

impl FlowOutput for JobMetadata {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn check_score(field: &str, score: u32) -> Result<(), String> {
    if score > MAX_SCORE {
        return Err(format!("{field} {score} is outside 0-{MAX_SCORE}"));
    }
    Ok(())
}

/// Parses raw model text into a validated flow output.
pub fn decode_output<T: FlowOutput>(text: &str) -> Result<T, LlmError> {
    let output: T = crate::llm_client::parse_json_output(text)?;
    output.validate().map_err(LlmError::InvalidOutput)?;
    Ok(output)
}

// ────────────────────────────────────────────────────────────────────────────
// Backend trait
// ────────────────────────────────────────────────────────────────────────────

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Runs the primary flow for a billable feature.
    async fn generate(
        &self,
        feature: Feature,
        input: &FeatureInput,
    ) -> Result<GeneratedContent, LlmError>;

    /// Secondary extraction used for automatic job tracking.
    async fn extract_job_metadata(&self, job_description: &str) -> Result<JobMetadata, LlmError>;
}

/// Production backend: prompt templates executed through [`LlmClient`].
pub struct LlmFlows {
    llm: LlmClient,
}

impl LlmFlows {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    async fn run<T: FlowOutput>(&self, prompt: &str, system: &str) -> Result<T, LlmError> {
        let system = format!("{system} {JSON_ONLY_SYSTEM}");
        let response = self.llm.call(prompt, &system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        decode_output(text)
    }
}

#[async_trait]
impl GenerationBackend for LlmFlows {
    async fn generate(
        &self,
        feature: Feature,
        input: &FeatureInput,
    ) -> Result<GeneratedContent, LlmError> {
        info!(%feature, model = self.llm.model(), "generation: running flow");
        let content = match feature {
            Feature::Resume => GeneratedContent::Resume(
                self.run(&build_prompt(RESUME_PROMPT_TEMPLATE, input), RESUME_SYSTEM)
                    .await?,
            ),
            Feature::CoverLetter => GeneratedContent::CoverLetter(
                self.run(
                    &build_prompt(COVER_LETTER_PROMPT_TEMPLATE, input),
                    COVER_LETTER_SYSTEM,
                )
                .await?,
            ),
            Feature::JobMatch => GeneratedContent::JobMatch(
                self.run(&build_prompt(JOB_MATCH_PROMPT_TEMPLATE, input), JOB_MATCH_SYSTEM)
                    .await?,
            ),
        };
        Ok(content)
    }

    async fn extract_job_metadata(&self, job_description: &str) -> Result<JobMetadata, LlmError> {
        let prompt = JOB_DETAILS_PROMPT_TEMPLATE.replace("{job_description}", job_description);
        self.run(&prompt, JOB_DETAILS_SYSTEM).await
    }
}

/// Fills a flow template. The résumé is substituted last so text inside it
/// that looks like a placeholder is left alone.
fn build_prompt(template: &str, input: &FeatureInput) -> String {
    template
        .replace("{honesty_instruction}", HONESTY_INSTRUCTION)
        .replace("{job_description}", &input.job_description)
        .replace("{resume_text}", &input.resume_text)
}
