// src/web/handlers/scoring_handlers.rs
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;

use crate::error::{AppError, AppResult};
use crate::types::{JobCreatedResponse, JobStatusResponse, ScoreRequest};
use crate::web::types::ServerState;

pub async fn score_profile_handler(
    id: &str,
    request: Json<ScoreRequest>,
    enhanced: bool,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<JobCreatedResponse>>> {
    let job = state.engine.submit(id, &request, enhanced).await?;
    Ok(Custom(Status::Accepted, Json(JobCreatedResponse::from(&job))))
}

pub async fn get_job_handler(id: &str, state: &State<ServerState>) -> AppResult<Json<JobStatusResponse>> {
    let job = state
        .store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::not_found("Scoring job", id))?;
    Ok(Json(JobStatusResponse::from(job)))
}
