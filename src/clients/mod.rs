// src/clients/mod.rs
//! Outbound HTTP clients: the Cassidy scraping workflow, Supabase PostgREST and
//! an OpenAI-compatible LLM endpoint.

pub mod cassidy;
pub mod llm;
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use cassidy::CassidyClient;
pub use llm::OpenAiCompatClient;
pub use supabase::SupabaseClient;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Workflow failed: {0}")]
    WorkflowFailed(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

/// Turns a non-2xx response into `ClientError::Api`, keeping the body as the message.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message: body,
    })
}

/// Result of asking the scraping workflow for a record.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// The run finished and produced this payload.
    Ready(Value),
    /// The run was accepted but is still going; the result arrives by webhook.
    Pending { run_id: String },
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, linkedin_url: &str) -> ClientResult<WorkflowOutcome>;

    async fn fetch_company(&self, linkedin_url: &str) -> ClientResult<WorkflowOutcome>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> ClientResult<String>;

    async fn embed(&self, text: &str) -> ClientResult<Vec<f32>>;

    fn embedding_model(&self) -> &str;
}
