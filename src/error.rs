// src/error.rs
use rocket::http::Status;
use thiserror::Error;

use crate::clients::ClientError;
use crate::linkedin::LinkedInUrlError;

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Errors surfaced by the service layer. Each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        AppError::NotFound(format!("{} '{}' not found", kind, id))
    }

    pub fn status(&self) -> Status {
        match self {
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::Unauthorized => Status::Unauthorized,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Validation(_) => Status::UnprocessableEntity,
            AppError::Upstream(_) => Status::BadGateway,
            AppError::Storage(_) | AppError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            AppError::BadRequest(_) => vec![
                "Use a modern profile URL such as https://www.linkedin.com/in/<name>".to_string(),
                "Check your request JSON format".to_string(),
            ],
            AppError::Unauthorized => vec!["Send a valid key in the x-api-key header".to_string()],
            AppError::NotFound(_) => vec!["Check the identifier and try again".to_string()],
            AppError::Validation(_) => {
                vec!["Provide exactly one of template_id or prompt".to_string()]
            }
            AppError::Upstream(_) => vec![
                "The scraping workflow or LLM provider is unavailable".to_string(),
                "Try again in a few moments".to_string(),
            ],
            AppError::Storage(_) | AppError::Internal(_) => vec![
                "Try again in a few moments".to_string(),
                "Contact support if the problem persists".to_string(),
            ],
        }
    }
}

impl From<LinkedInUrlError> for AppError {
    fn from(err: LinkedInUrlError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(format!("serialization failed: {}", err))
    }
}
