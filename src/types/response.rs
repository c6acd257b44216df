// src/types/response.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::scoring::{JobStatus, ScoringJob};
use crate::linkedin::LinkedInKind;
use crate::timestamp;
use crate::utils::extract_json_object;

// ===== Cassidy workflow responses =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunEnvelope {
    #[serde(rename = "workflowRun", alias = "workflow_run")]
    pub workflow_run: WorkflowRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "actionResults", alias = "action_results")]
    pub action_results: Vec<ActionResult>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Completed,
    Running,
    Failed,
}

impl WorkflowRun {
    pub fn state(&self) -> WorkflowState {
        match self.status.trim().to_uppercase().as_str() {
            "COMPLETED" | "SUCCEEDED" | "SUCCESS" => WorkflowState::Completed,
            "RUNNING" | "QUEUED" | "PENDING" | "IN_PROGRESS" | "STARTED" => WorkflowState::Running,
            _ => WorkflowState::Failed,
        }
    }

    /// Output of the last action that produced a JSON object.
    ///
    /// Action outputs arrive either as objects or as JSON text, sometimes wrapped
    /// in a fenced code block.
    pub fn payload(&self) -> Option<Value> {
        self.action_results
            .iter()
            .rev()
            .find_map(|result| match &result.output {
                Value::Object(_) => Some(result.output.clone()),
                Value::String(text) => extract_json_object(text),
                _ => None,
            })
    }
}

/// Body Cassidy posts back when an asynchronous scrape finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentCallback {
    #[serde(alias = "url", alias = "profile_url")]
    pub linkedin_url: String,
    #[serde(default)]
    pub kind: Option<LinkedInKind>,
    #[serde(default, rename = "workflowRun", alias = "workflow_run")]
    pub workflow_run: Option<WorkflowRun>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EnrichmentCallback {
    pub fn payload(&self) -> Option<Value> {
        match &self.data {
            Some(Value::Object(_)) => self.data.clone(),
            Some(Value::String(text)) => extract_json_object(text),
            _ => self.workflow_run.as_ref().and_then(WorkflowRun::payload),
        }
    }

    pub fn failure(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let failed_status = self
            .status
            .as_deref()
            .map(|s| matches!(s.to_lowercase().as_str(), "failed" | "error"))
            .unwrap_or(false);
        if failed_status {
            return Some("enrichment workflow reported failure".to_string());
        }
        match &self.workflow_run {
            Some(run) if run.state() == WorkflowState::Failed => Some(
                run.error
                    .clone()
                    .unwrap_or_else(|| format!("workflow run ended with status {}", run.status)),
            ),
            _ => None,
        }
    }
}

// ===== Service API responses =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub profile_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub profile_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub enhanced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<&ScoringJob> for JobCreatedResponse {
    fn from(job: &ScoringJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            profile_id: job.profile_id.clone(),
        }
    }
}

impl From<ScoringJob> for JobStatusResponse {
    fn from(job: ScoringJob) -> Self {
        Self {
            job_id: job.id,
            profile_id: job.profile_id,
            status: job.status,
            template_id: job.template_id,
            enhanced: job.enhanced,
            result: job.result,
            error: job.error,
            created_at: timestamp::format_micros(&job.created_at),
            started_at: job.started_at.as_ref().map(timestamp::format_micros),
            completed_at: job.completed_at.as_ref().map(timestamp::format_micros),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
