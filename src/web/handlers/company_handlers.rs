// src/web/handlers/company_handlers.rs
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;

use crate::error::{AppError, AppResult};
use crate::types::Company;
use crate::web::types::{IngestCompanyRequest, ServerState};

pub async fn create_company_handler(
    request: Json<IngestCompanyRequest>,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<Company>>> {
    let ingested = state.ingest.ingest_company(&request.linkedin_url).await?;
    let status = if ingested.created {
        Status::Created
    } else {
        Status::Ok
    };
    Ok(Custom(status, Json(ingested.record)))
}

pub async fn get_company_handler(id: &str, state: &State<ServerState>) -> AppResult<Json<Company>> {
    state
        .store
        .get_company(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Company", id))
}
