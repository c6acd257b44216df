// src/web/handlers/template_handlers.rs
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::types::{NewTemplate, PromptTemplate};
use crate::web::types::ServerState;

pub async fn list_templates_handler(
    category: Option<&str>,
    active_only: Option<bool>,
    state: &State<ServerState>,
) -> AppResult<Json<Vec<PromptTemplate>>> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let templates = state
        .store
        .list_templates(category, active_only.unwrap_or(false))
        .await?;
    Ok(Json(templates))
}

pub async fn create_template_handler(
    request: Json<NewTemplate>,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<PromptTemplate>>> {
    let template = request.into_inner().into_template()?;
    state.store.insert_template(&template).await?;
    info!(template_id = %template.id, category = %template.category, "Prompt template created");
    Ok(Custom(Status::Created, Json(template)))
}

pub async fn get_template_handler(id: &str, state: &State<ServerState>) -> AppResult<Json<PromptTemplate>> {
    state
        .store
        .get_template(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Template", id))
}
