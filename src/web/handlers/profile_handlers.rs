// src/web/handlers/profile_handlers.rs
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value};
use rocket::State;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::store::clamp_limit;
use crate::web::compat::profile_json;
use crate::web::types::{IngestProfileRequest, ProfileListResponse, ServerState};

pub async fn create_profile_handler(
    request: Json<IngestProfileRequest>,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<Value>>> {
    let request = request.into_inner();
    info!(
        url = %request.linkedin_url,
        force_refresh = request.force_refresh,
        include_company = request.include_company,
        "Profile ingestion requested"
    );

    let ingested = state
        .ingest
        .ingest_profile(
            &request.linkedin_url,
            request.force_refresh,
            request.include_company,
        )
        .await?;
    let status = if ingested.created {
        Status::Created
    } else {
        Status::Ok
    };
    Ok(Custom(status, Json(profile_json(&ingested.record))))
}

pub async fn list_profiles_handler(
    limit: Option<u32>,
    offset: Option<u32>,
    state: &State<ServerState>,
) -> AppResult<Json<ProfileListResponse>> {
    let limit = clamp_limit(limit);
    let offset = offset.unwrap_or(0);
    let profiles = state.store.list_profiles(limit, offset).await?;

    Ok(Json(ProfileListResponse {
        success: true,
        count: profiles.len(),
        profiles: profiles.iter().map(profile_json).collect(),
        limit,
        offset,
    }))
}

pub async fn get_profile_handler(id: &str, state: &State<ServerState>) -> AppResult<Json<Value>> {
    let profile = state
        .store
        .get_profile(id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile", id))?;
    Ok(Json(profile_json(&profile)))
}

pub async fn delete_profile_handler(id: &str, state: &State<ServerState>) -> AppResult<Status> {
    if !state.store.delete_profile(id).await? {
        return Err(AppError::not_found("Profile", id));
    }
    info!(profile_id = id, "Profile deleted");
    Ok(Status::NoContent)
}
