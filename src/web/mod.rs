// src/web/mod.rs
//! HTTP API under /api/v1.

pub mod auth;
pub mod compat;
pub mod handlers;
pub mod types;

pub use auth::ApiKey;
pub use types::*;

use anyhow::Context;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status::Custom;
use rocket::serde::json::{Json, Value};
use rocket::{catchers, delete, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::info;

use crate::clients::{CassidyClient, LlmBackend, OpenAiCompatClient, SupabaseClient};
use crate::core::{ConfigManager, StorageBackend};
use crate::error::AppResult;
use crate::ingest::IngestService;
use crate::scoring::ScoringEngine;
use crate::store::{ProfileStore, SqliteStore, SupabaseStore};
use crate::types::{
    Company, EnrichmentCallback, HealthResponse, JobCreatedResponse, JobStatusResponse,
    NewTemplate, PromptTemplate, ScoreRequest,
};

pub const API_BASE: &str = "/api/v1";

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/health")]
pub async fn health(state: &State<ServerState>) -> Custom<Json<HealthResponse>> {
    handlers::health_handler(state).await
}

#[post("/profiles", data = "<request>")]
pub async fn create_profile(
    request: Json<IngestProfileRequest>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<Value>>> {
    handlers::create_profile_handler(request, state).await
}

#[get("/profiles?<limit>&<offset>")]
pub async fn list_profiles(
    limit: Option<u32>,
    offset: Option<u32>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Json<ProfileListResponse>> {
    handlers::list_profiles_handler(limit, offset, state).await
}

#[get("/profiles/<id>")]
pub async fn get_profile(id: &str, _key: ApiKey, state: &State<ServerState>) -> AppResult<Json<Value>> {
    handlers::get_profile_handler(id, state).await
}

#[delete("/profiles/<id>")]
pub async fn delete_profile(id: &str, _key: ApiKey, state: &State<ServerState>) -> AppResult<Status> {
    handlers::delete_profile_handler(id, state).await
}

#[post("/profiles/<id>/score", data = "<request>")]
pub async fn score_profile(
    id: &str,
    request: Json<ScoreRequest>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<JobCreatedResponse>>> {
    handlers::score_profile_handler(id, request, false, state).await
}

#[post("/profiles/<id>/score-enhanced", data = "<request>")]
pub async fn score_profile_enhanced(
    id: &str,
    request: Json<ScoreRequest>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<JobCreatedResponse>>> {
    handlers::score_profile_handler(id, request, true, state).await
}

#[get("/scoring-jobs/<id>")]
pub async fn get_scoring_job(
    id: &str,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Json<JobStatusResponse>> {
    handlers::get_job_handler(id, state).await
}

#[get("/templates?<category>&<active_only>")]
pub async fn list_templates(
    category: Option<&str>,
    active_only: Option<bool>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Json<Vec<PromptTemplate>>> {
    handlers::list_templates_handler(category, active_only, state).await
}

#[post("/templates", data = "<request>")]
pub async fn create_template(
    request: Json<NewTemplate>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<PromptTemplate>>> {
    handlers::create_template_handler(request, state).await
}

#[get("/templates/<id>")]
pub async fn get_template(
    id: &str,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Json<PromptTemplate>> {
    handlers::get_template_handler(id, state).await
}

#[post("/companies", data = "<request>")]
pub async fn create_company(
    request: Json<IngestCompanyRequest>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Custom<Json<Company>>> {
    handlers::create_company_handler(request, state).await
}

#[get("/companies/<id>")]
pub async fn get_company(id: &str, _key: ApiKey, state: &State<ServerState>) -> AppResult<Json<Company>> {
    handlers::get_company_handler(id, state).await
}

#[post("/webhooks/cassidy", data = "<callback>")]
pub async fn cassidy_webhook(
    callback: Json<EnrichmentCallback>,
    _key: ApiKey,
    state: &State<ServerState>,
) -> AppResult<Json<WebhookResponse>> {
    handlers::cassidy_callback_handler(callback, state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

#[rocket::catch(default)]
pub fn default_catcher(status: Status, _req: &Request<'_>) -> Custom<Json<StandardErrorResponse>> {
    Custom(status, Json(catcher_body(status)))
}

/// Assembles the API without launching it.
pub fn build_rocket(state: ServerState, port: Option<u16>) -> Rocket<Build> {
    let mut figment = rocket::Config::figment();
    if let Some(port) = port {
        figment = figment.merge(("port", port)).merge(("address", "0.0.0.0"));
    }

    rocket::custom(figment)
        .attach(Cors)
        .manage(state)
        .register("/", catchers![default_catcher])
        .mount(
            API_BASE,
            routes![
                health,
                create_profile,
                list_profiles,
                get_profile,
                delete_profile,
                score_profile,
                score_profile_enhanced,
                get_scoring_job,
                list_templates,
                create_template,
                get_template,
                create_company,
                get_company,
                cassidy_webhook,
                options,
            ],
        )
}

/// Wires storage and the outbound clients from configuration.
pub async fn build_state(config: &ConfigManager) -> anyhow::Result<ServerState> {
    let api_key = config.require_api_key()?;

    let store: Arc<dyn ProfileStore> = match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.sqlite_path_absolute()?;
            info!(path = %path.display(), "Using SQLite storage");
            Arc::new(SqliteStore::new(&path).await.context("Failed to open SQLite database")?)
        }
        StorageBackend::Supabase => {
            let url = config
                .storage
                .supabase_url
                .as_deref()
                .context("SUPABASE_URL must be set for the supabase backend")?;
            let key = config
                .storage
                .supabase_service_key
                .clone()
                .context("SUPABASE_SERVICE_KEY must be set for the supabase backend")?;
            info!(url, "Using Supabase storage");
            Arc::new(SupabaseStore::new(SupabaseClient::new(url, key)?))
        }
    };

    let workflow_url = config
        .cassidy
        .profile_workflow_url
        .clone()
        .context("CASSIDY_PROFILE_WORKFLOW_URL must be set")?;
    let source = Arc::new(
        CassidyClient::new(workflow_url, config.cassidy.api_key.clone())?
            .with_company_workflow(config.cassidy.company_workflow_url.clone()),
    );

    let llm_key = config.llm.api_key.clone().context("LLM_API_KEY must be set")?;
    let mut llm = OpenAiCompatClient::new(llm_key)?;
    if let Some(url) = &config.llm.base_url {
        llm = llm.with_base_url(url);
    }
    if let Some(model) = &config.llm.model {
        llm = llm.with_model(model);
    }
    if let Some(model) = &config.llm.embedding_model {
        llm = llm.with_embedding_model(model);
    }
    let llm: Arc<dyn LlmBackend> = Arc::new(llm);

    let embedder = config.llm.embeddings_enabled.then(|| llm.clone());
    Ok(ServerState {
        store: store.clone(),
        ingest: IngestService::new(store.clone(), source).with_embeddings(embedder),
        engine: ScoringEngine::new(store.clone(), llm),
        api_key,
    })
}

pub async fn start_web_server(state: ServerState, port: u16) -> anyhow::Result<()> {
    tracing::info!(port, storage = state.store.backend_name(), "Starting LinkedIn scorer API server");
    build_rocket(state, Some(port)).launch().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LlmBackend;
    use crate::ingest::testing::{StubLlm, StubSource};
    use crate::ingest::IngestService;
    use crate::scoring::ScoringEngine;
    use crate::store::{ProfileStore, SqliteStore};
    use rocket::http::{ContentType, Header};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const KEY: &str = "test-key";

    async fn client_with(llm_reply: &str) -> Client {
        let store: Arc<dyn ProfileStore> = Arc::new(SqliteStore::in_memory().await.unwrap());
        let source = Arc::new(StubSource::ready(
            json!({"full_name": "Jane Doe", "headline": "Engineer", "experiences": [{"title": "Engineer", "start_year": ""}]}),
            json!({"name": "Acme"}),
        ));
        let llm: Arc<dyn LlmBackend> = Arc::new(StubLlm::replying(llm_reply));
        let state = ServerState {
            store: store.clone(),
            ingest: IngestService::new(store.clone(), source),
            engine: ScoringEngine::new(store.clone(), llm),
            api_key: KEY.to_string(),
        };
        Client::tracked(build_rocket(state, None)).await.unwrap()
    }

    fn key() -> Header<'static> {
        Header::new("X-API-Key", KEY)
    }

    async fn post(client: &Client, path: &str, body: serde_json::Value) -> (Status, serde_json::Value) {
        let response = client
            .post(format!("{}{}", API_BASE, path))
            .header(ContentType::JSON)
            .header(key())
            .body(body.to_string())
            .dispatch()
            .await;
        let status = response.status();
        let json = response.into_json().await.unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn get(client: &Client, path: &str) -> (Status, serde_json::Value) {
        let response = client
            .get(format!("{}{}", API_BASE, path))
            .header(key())
            .dispatch()
            .await;
        let status = response.status();
        let json = response.into_json().await.unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn ingest_jane(client: &Client) -> String {
        let (status, body) = post(
            client,
            "/profiles",
            json!({"linkedin_url": "https://www.linkedin.com/in/jane-doe"}),
        )
        .await;
        assert_eq!(status, Status::Created);
        body["id"].as_str().unwrap().to_string()
    }

    #[rocket::async_test]
    async fn test_health_needs_no_key() {
        let client = client_with("{}").await;
        let response = client.get("/api/v1/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "sqlite");
    }

    #[rocket::async_test]
    async fn test_missing_or_wrong_key_is_unauthorized() {
        let client = client_with("{}").await;
        let response = client.get("/api/v1/profiles").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error_code"], "UNAUTHORIZED");
        assert_eq!(body["success"], false);

        let response = client
            .get("/api/v1/profiles")
            .header(Header::new("x-api-key", "nope"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_legacy_url_rejected_and_modern_url_created() {
        let client = client_with("{}").await;
        let (status, body) = post(
            &client,
            "/profiles",
            json!({"url": "https://www.linkedin.com/pub/jane-doe/8/946/143"}),
        )
        .await;
        assert_eq!(status, Status::BadRequest);
        assert_eq!(body["error_code"], "BAD_REQUEST");

        let (status, body) = post(
            &client,
            "/profiles",
            json!({"linkedin_url": "https://www.linkedin.com/in/jane-doe"}),
        )
        .await;
        assert_eq!(status, Status::Created);
        assert_eq!(body["name"], "Jane Doe");
        assert_eq!(body["profile_id"], body["id"]);
        assert_eq!(body["experiences"][0]["start_year"], serde_json::Value::Null);

        let (status, again) = post(
            &client,
            "/profiles",
            json!({"linkedin_url": "https://linkedin.com/in/jane-doe/"}),
        )
        .await;
        assert_eq!(status, Status::Ok);
        assert_eq!(again["id"], body["id"]);
    }

    #[rocket::async_test]
    async fn test_score_request_validation() {
        let client = client_with("{}").await;
        let id = ingest_jane(&client).await;

        let (status, body) = post(
            &client,
            &format!("/profiles/{}/score", id),
            json!({"template_id": "t1", "prompt": "rate"}),
        )
        .await;
        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");

        let (status, _) = post(&client, &format!("/profiles/{}/score", id), json!({})).await;
        assert_eq!(status, Status::UnprocessableEntity);

        let (status, _) = post(
            &client,
            &format!("/profiles/{}/score", id),
            json!({"template_id": "missing-template"}),
        )
        .await;
        assert_eq!(status, Status::NotFound);

        let (status, _) = post(&client, "/profiles/nobody/score", json!({"prompt": "rate"})).await;
        assert_eq!(status, Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_completed_job_exposes_result() {
        let client = client_with(r#"{"score": 91, "summary": "Excellent"}"#).await;
        let id = ingest_jane(&client).await;

        let (status, template) = post(
            &client,
            "/templates",
            json!({"name": "Engineer", "category": "Engineering", "prompt": "Rate {{name}}"}),
        )
        .await;
        assert_eq!(status, Status::Created);
        assert_eq!(template["category"], "engineering");

        let (status, created) = post(
            &client,
            &format!("/profiles/{}/score-enhanced", id),
            json!({"template_id": template["id"]}),
        )
        .await;
        assert_eq!(status, Status::Accepted);
        assert_eq!(created["status"], "pending");
        let job_id = created["job_id"].as_str().unwrap().to_string();

        let mut job = serde_json::Value::Null;
        for _ in 0..200 {
            let (_, body) = get(&client, &format!("/scoring-jobs/{}", job_id)).await;
            if body["status"] == "completed" || body["status"] == "failed" {
                job = body;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(job["status"], "completed");
        assert_eq!(job["result"]["score"], 91);
        assert!(job["result"].as_object().is_some_and(|r| !r.is_empty()));
        assert!(job["completed_at"].as_str().is_some());
    }

    #[rocket::async_test]
    async fn test_templates_and_companies() {
        let client = client_with("{}").await;
        let (status, _) = post(
            &client,
            "/templates",
            json!({"name": "", "category": "x", "prompt": "y"}),
        )
        .await;
        assert_eq!(status, Status::UnprocessableEntity);

        let (status, list) = get(&client, "/templates?active_only=true").await;
        assert_eq!(status, Status::Ok);
        assert_eq!(list, json!([]));

        let (status, _) = get(&client, "/templates/unknown").await;
        assert_eq!(status, Status::NotFound);

        let (status, company) = post(
            &client,
            "/companies",
            json!({"linkedin_url": "https://www.linkedin.com/company/acme"}),
        )
        .await;
        assert_eq!(status, Status::Created);
        let (status, fetched) = get(&client, &format!("/companies/{}", company["id"].as_str().unwrap())).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(fetched["name"], "Acme");

        let (status, _) = post(
            &client,
            "/companies",
            json!({"linkedin_url": "https://www.linkedin.com/in/not-a-company"}),
        )
        .await;
        assert_eq!(status, Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_list_and_delete_profiles() {
        let client = client_with("{}").await;
        let id = ingest_jane(&client).await;

        let (status, list) = get(&client, "/profiles?limit=500").await;
        assert_eq!(status, Status::Ok);
        assert_eq!(list["count"], 1);
        assert_eq!(list["limit"], 100);

        let response = client
            .delete(format!("{}/profiles/{}", API_BASE, id))
            .header(key())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let (status, body) = get(&client, &format!("/profiles/{}", id)).await;
        assert_eq!(status, Status::NotFound);
        assert_eq!(body["error_code"], "NOT_FOUND");
    }

    #[rocket::async_test]
    async fn test_webhook_unknown_profile_and_malformed_body() {
        let client = client_with("{}").await;
        let (status, _) = post(
            &client,
            "/webhooks/cassidy",
            json!({"linkedin_url": "https://www.linkedin.com/in/ghost", "data": {"full_name": "Ghost"}}),
        )
        .await;
        assert_eq!(status, Status::NotFound);

        let response = client
            .post("/api/v1/profiles")
            .header(ContentType::JSON)
            .header(key())
            .body("{not json")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
    }
}
