// src/web/handlers/webhook_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use crate::error::AppResult;
use crate::ingest::EnrichedRecord;
use crate::types::EnrichmentCallback;
use crate::web::types::{ServerState, WebhookResponse};

pub async fn cassidy_callback_handler(
    callback: Json<EnrichmentCallback>,
    state: &State<ServerState>,
) -> AppResult<Json<WebhookResponse>> {
    info!(url = %callback.linkedin_url, "Cassidy callback received");
    let response = match state.ingest.apply_enrichment(&callback).await? {
        EnrichedRecord::Profile(profile) => WebhookResponse {
            success: true,
            kind: "profile",
            id: profile.id,
        },
        EnrichedRecord::Company(company) => WebhookResponse {
            success: true,
            kind: "company",
            id: company.id,
        },
    };
    Ok(Json(response))
}
