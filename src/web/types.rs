// src/web/types.rs
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::AppError;
use crate::ingest::IngestService;
use crate::scoring::ScoringEngine;
use crate::store::ProfileStore;

/// Everything route handlers need, managed by Rocket.
pub struct ServerState {
    pub store: Arc<dyn ProfileStore>,
    pub ingest: IngestService,
    pub engine: ScoringEngine,
    pub api_key: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Error,
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

impl From<&AppError> for StandardErrorResponse {
    fn from(err: &AppError) -> Self {
        Self::new(err.to_string(), err.code().to_string(), err.suggestions())
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            error!(method = %req.method(), uri = %req.uri(), error = %self, "Request failed");
        } else {
            warn!(method = %req.method(), uri = %req.uri(), status = status.code, error = %self, "Request rejected");
        }
        let body = Json(StandardErrorResponse::from(&self));
        Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct IngestProfileRequest {
    #[serde(alias = "url", alias = "profile_url")]
    pub linkedin_url: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub include_company: bool,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct IngestCompanyRequest {
    #[serde(alias = "url", alias = "company_url")]
    pub linkedin_url: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileListResponse {
    pub success: bool,
    pub profiles: Vec<rocket::serde::json::Value>,
    pub count: usize,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct WebhookResponse {
    pub success: bool,
    pub kind: &'static str,
    pub id: String,
}

/// Maps a status with no handler-provided body to the standard error body.
pub fn catcher_body(status: Status) -> StandardErrorResponse {
    let (error, code, suggestions) = match status.code {
        400 => (
            "Invalid request format",
            "BAD_REQUEST",
            vec!["Check your request JSON format", "Verify all required fields are present"],
        ),
        401 => (
            "Invalid or missing API key",
            "UNAUTHORIZED",
            vec!["Send a valid key in the x-api-key header"],
        ),
        404 => (
            "Resource not found",
            "NOT_FOUND",
            vec!["Check the URL path; all endpoints live under /api/v1"],
        ),
        422 => (
            "Request body could not be processed",
            "VALIDATION_ERROR",
            vec!["Verify field names and types", "Verify all required fields are present"],
        ),
        _ => (
            "Internal server error",
            "INTERNAL_ERROR",
            vec!["Try again in a few moments", "Contact support if the problem persists"],
        ),
    };
    StandardErrorResponse::new(
        error.to_string(),
        code.to_string(),
        suggestions.into_iter().map(String::from).collect(),
    )
}
