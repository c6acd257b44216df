// src/web/handlers/system_handlers.rs
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use crate::timestamp;
use crate::types::HealthResponse;
use crate::web::types::ServerState;

pub async fn health_handler(state: &State<ServerState>) -> Custom<Json<HealthResponse>> {
    let (status, code) = match state.store.health_check().await {
        Ok(()) => ("healthy", Status::Ok),
        Err(e) => {
            error!(error = %e, "Storage health check failed");
            ("degraded", Status::ServiceUnavailable)
        }
    };
    Custom(
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: state.store.backend_name().to_string(),
            timestamp: timestamp::format_micros(&timestamp::now()),
        }),
    )
}
