// src/types/scoring.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed moves: pending → processing → completed|failed, and pending → failed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringJob {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub enhanced: bool,
    #[serde(default)]
    pub model: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(with = "timestamp::micros")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option_micros")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option_micros")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScoringJob {
    pub fn new(profile_id: String, selection: PromptSelection, enhanced: bool, model: Option<String>) -> Self {
        let (template_id, prompt) = match selection {
            PromptSelection::Template(id) => (Some(id), None),
            PromptSelection::Prompt(text) => (None, Some(text)),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id,
            template_id,
            prompt,
            enhanced,
            model,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: timestamp::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "scoring job {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_processing(&mut self) -> AppResult<()> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(timestamp::now());
        Ok(())
    }

    pub fn mark_completed(&mut self, result: Map<String, Value>) -> AppResult<()> {
        self.transition(JobStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(timestamp::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> AppResult<()> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(timestamp::now());
        Ok(())
    }
}

/// What a scoring job runs against: a stored template or a free-text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSelection {
    Template(String),
    Prompt(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoreRequest {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ScoreRequest {
    /// Exactly one of `template_id` / `prompt` must be set; blank counts as unset.
    pub fn selection(&self) -> AppResult<PromptSelection> {
        let template_id = non_blank(&self.template_id);
        let prompt = non_blank(&self.prompt);
        match (template_id, prompt) {
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either template_id or prompt, not both".to_string(),
            )),
            (None, None) => Err(AppError::Validation(
                "Either template_id or prompt is required".to_string(),
            )),
            (Some(id), None) => Ok(PromptSelection::Template(id.to_string())),
            (None, Some(text)) => Ok(PromptSelection::Prompt(text.to_string())),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub prompt: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(with = "timestamp::micros")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::micros")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl PromptTemplate {
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(Value::as_f64)
    }

    pub fn metadata_u32(&self, key: &str) -> Option<u32> {
        self.metadata
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub category: String,
    pub prompt: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl NewTemplate {
    pub fn into_template(self) -> AppResult<PromptTemplate> {
        for (field, value) in [
            ("name", &self.name),
            ("category", &self.category),
            ("prompt", &self.prompt),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} must not be empty", field)));
            }
        }
        let now = timestamp::now();
        Ok(PromptTemplate {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_lowercase(),
            prompt: self.prompt,
            is_active: self.is_active.unwrap_or(true),
            metadata: self.metadata.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}
