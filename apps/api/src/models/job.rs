use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Pipeline stage of a tracked application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Saved,
    Applied,
    Interviewing,
    Offer,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Saved,
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Saved => "Saved",
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub title: String,
    pub location: String,
    pub application_date: NaiveDate,
    pub status: String,
    pub notes: String,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new or edited job record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDraft {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub application_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub notes: String,
    pub job_description: Option<String>,
}

impl JobDraft {
    /// Trims text fields and rejects drafts without a company or title.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.company = self.company.trim().to_string();
        self.title = self.title.trim().to_string();
        self.location = self.location.trim().to_string();
        if self.company.is_empty() {
            return Err("company cannot be empty".to_string());
        }
        if self.title.is_empty() {
            return Err("title cannot be empty".to_string());
        }
        self.job_description = self
            .job_description
            .filter(|jd| !jd.trim().is_empty());
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: i64,
}
