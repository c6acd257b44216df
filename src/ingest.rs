// src/ingest.rs
//! LinkedIn URL → Cassidy scrape → normalized record → store (+ embedding).

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{LlmBackend, ProfileSource, WorkflowOutcome};
use crate::error::{AppError, AppResult};
use crate::linkedin::{self, LinkedInKind};
use crate::store::{ProfileEmbedding, ProfileStore};
use crate::types::{Company, EnrichmentCallback, EnrichmentStatus, Profile};
use crate::utils::truncate_chars;

/// Embedding input is capped to stay under provider token limits.
const EMBEDDING_MAX_CHARS: usize = 8000;

#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub record: T,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum EnrichedRecord {
    Profile(Profile),
    Company(Company),
}

#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn ProfileStore>,
    source: Arc<dyn ProfileSource>,
    embedder: Option<Arc<dyn LlmBackend>>,
}

impl IngestService {
    pub fn new(store: Arc<dyn ProfileStore>, source: Arc<dyn ProfileSource>) -> Self {
        Self {
            store,
            source,
            embedder: None,
        }
    }

    /// Enables embedding computation after each successful enrichment.
    pub fn with_embeddings(mut self, embedder: Option<Arc<dyn LlmBackend>>) -> Self {
        self.embedder = embedder;
        self
    }

    pub async fn ingest_profile(
        &self,
        raw_url: &str,
        force_refresh: bool,
        include_company: bool,
    ) -> AppResult<Ingested<Profile>> {
        let url = linkedin::parse_profile(raw_url)?.normalized();
        let existing = self.store.find_profile_by_url(&url).await?;

        if let Some(profile) = &existing {
            if !force_refresh {
                info!(profile_id = %profile.id, url = %url, "Profile already stored");
                return Ok(Ingested {
                    record: profile.clone(),
                    created: false,
                });
            }
        }

        let fresh = match self.source.fetch_profile(&url).await? {
            WorkflowOutcome::Ready(payload) => Some(
                Profile::from_cassidy(&payload, url.clone()).ok_or_else(|| {
                    AppError::Upstream("profile payload was not a JSON object".to_string())
                })?,
            ),
            WorkflowOutcome::Pending { run_id } => {
                info!(url = %url, run_id = %run_id, "Profile scrape pending, awaiting callback");
                None
            }
        };

        let (profile, created) = match (existing, fresh) {
            (Some(mut profile), Some(fresh)) => {
                profile.apply_enrichment(fresh);
                self.store.update_profile(&profile).await?;
                (profile, false)
            }
            (Some(profile), None) => (profile, false),
            (None, fresh) => {
                let profile = fresh.unwrap_or_else(|| Profile::pending(url.clone()));
                if !self.store.insert_profile(&profile).await? {
                    let stored = self
                        .store
                        .find_profile_by_url(&url)
                        .await?
                        .ok_or_else(|| AppError::Storage(format!("profile row for {} disappeared", url)))?;
                    info!(profile_id = %stored.id, url = %url, "Profile stored by a concurrent request");
                    return Ok(Ingested {
                        record: stored,
                        created: false,
                    });
                }
                (profile, true)
            }
        };
        info!(
            profile_id = %profile.id,
            created,
            status = profile.enrichment_status.as_str(),
            "Profile ingested"
        );

        if profile.enrichment_status == EnrichmentStatus::Enriched {
            self.embed_profile(&profile).await;
            if include_company {
                self.ingest_current_company(&profile).await;
            }
        }

        Ok(Ingested {
            record: profile,
            created,
        })
    }

    async fn ingest_current_company(&self, profile: &Profile) {
        let Some(company_url) = profile.current_company_url.as_deref() else {
            return;
        };
        if linkedin::parse_company(company_url).is_err() {
            return;
        }
        if let Err(e) = self.ingest_company(company_url).await {
            warn!(profile_id = %profile.id, error = %e, "Current company ingestion failed");
        }
    }

    pub async fn ingest_company(&self, raw_url: &str) -> AppResult<Ingested<Company>> {
        let url = linkedin::parse_company(raw_url)?.normalized();
        if let Some(company) = self.store.find_company_by_url(&url).await? {
            return Ok(Ingested {
                record: company,
                created: false,
            });
        }

        let company = match self.source.fetch_company(&url).await? {
            WorkflowOutcome::Ready(payload) => Company::from_cassidy(&payload, url.clone())
                .ok_or_else(|| {
                    AppError::Upstream("company payload was not a JSON object".to_string())
                })?,
            WorkflowOutcome::Pending { run_id } => {
                info!(url = %url, run_id = %run_id, "Company scrape pending, awaiting callback");
                Company::new(url.clone())
            }
        };
        if !self.store.insert_company(&company).await? {
            let stored = self
                .store
                .find_company_by_url(&url)
                .await?
                .ok_or_else(|| AppError::Storage(format!("company row for {} disappeared", url)))?;
            return Ok(Ingested {
                record: stored,
                created: false,
            });
        }
        info!(company_id = %company.id, url = %url, "Company ingested");

        Ok(Ingested {
            record: company,
            created: true,
        })
    }

    /// Applies a Cassidy callback to the record it names.
    pub async fn apply_enrichment(&self, callback: &EnrichmentCallback) -> AppResult<EnrichedRecord> {
        let parsed = linkedin::parse(&callback.linkedin_url)?;
        let kind = callback.kind.unwrap_or(parsed.kind);
        let url = parsed.normalized();

        match kind {
            LinkedInKind::Profile => {
                let mut profile = self
                    .store
                    .find_profile_by_url(&url)
                    .await?
                    .ok_or_else(|| AppError::not_found("Profile", &url))?;

                if let Some(reason) = callback.failure() {
                    warn!(profile_id = %profile.id, reason = %reason, "Enrichment failed");
                    profile.enrichment_status = EnrichmentStatus::Failed;
                    profile.updated_at = crate::timestamp::now();
                    self.store.update_profile(&profile).await?;
                    return Ok(EnrichedRecord::Profile(profile));
                }

                let fresh = callback
                    .payload()
                    .and_then(|payload| Profile::from_cassidy(&payload, url.clone()))
                    .ok_or_else(|| {
                        AppError::BadRequest("callback carried no profile payload".to_string())
                    })?;
                profile.apply_enrichment(fresh);
                self.store.update_profile(&profile).await?;
                info!(profile_id = %profile.id, "Profile enriched from callback");
                self.embed_profile(&profile).await;
                Ok(EnrichedRecord::Profile(profile))
            }
            LinkedInKind::Company => {
                let mut company = self
                    .store
                    .find_company_by_url(&url)
                    .await?
                    .ok_or_else(|| AppError::not_found("Company", &url))?;
                if let Some(reason) = callback.failure() {
                    return Err(AppError::Upstream(format!(
                        "company enrichment failed: {}",
                        reason
                    )));
                }
                let fresh = callback
                    .payload()
                    .and_then(|payload| Company::from_cassidy(&payload, url.clone()))
                    .ok_or_else(|| {
                        AppError::BadRequest("callback carried no company payload".to_string())
                    })?;
                company.apply_enrichment(fresh);
                self.store.update_company(&company).await?;
                info!(company_id = %company.id, "Company enriched from callback");
                Ok(EnrichedRecord::Company(company))
            }
        }
    }

    /// Best effort: failures are logged and the profile stays without an embedding.
    async fn embed_profile(&self, profile: &Profile) {
        let Some(embedder) = &self.embedder else {
            return;
        };
        let text = truncate_chars(&profile.summary_text(), EMBEDDING_MAX_CHARS);
        match embedder.embed(&text).await {
            Ok(vector) => {
                let embedding = ProfileEmbedding::new(
                    profile.id.clone(),
                    embedder.embedding_model().to_string(),
                    vector,
                );
                if let Err(e) = self.store.upsert_embedding(&embedding).await {
                    warn!(profile_id = %profile.id, error = %e, "Failed to store embedding");
                }
            }
            Err(e) => warn!(profile_id = %profile.id, error = %e, "Embedding request failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process stand-ins for the outbound clients.

    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::clients::{
        ClientError, ClientResult, CompletionRequest, LlmBackend, ProfileSource, WorkflowOutcome,
    };

    pub struct StubSource {
        pub profile: Mutex<ClientResult<WorkflowOutcome>>,
        pub company: Mutex<ClientResult<WorkflowOutcome>>,
        pub calls: AtomicUsize,
    }

    impl StubSource {
        pub fn ready(profile: Value, company: Value) -> Self {
            Self {
                profile: Mutex::new(Ok(WorkflowOutcome::Ready(profile))),
                company: Mutex::new(Ok(WorkflowOutcome::Ready(company))),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                profile: Mutex::new(Err(ClientError::WorkflowFailed("blocked".into()))),
                company: Mutex::new(Err(ClientError::WorkflowFailed("blocked".into()))),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn replay(slot: &Mutex<ClientResult<WorkflowOutcome>>) -> ClientResult<WorkflowOutcome> {
        let guard = slot.lock().unwrap();
        match &*guard {
            Ok(outcome) => Ok(outcome.clone()),
            Err(e) => Err(ClientError::WorkflowFailed(e.to_string())),
        }
    }

    #[async_trait]
    impl ProfileSource for StubSource {
        async fn fetch_profile(&self, _url: &str) -> ClientResult<WorkflowOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            replay(&self.profile)
        }

        async fn fetch_company(&self, _url: &str) -> ClientResult<WorkflowOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            replay(&self.company)
        }
    }

    /// Replies with a fixed completion and records the last request.
    pub struct StubLlm {
        pub reply: ClientResult<String>,
        pub last_request: Mutex<Option<CompletionRequest>>,
    }

    impl StubLlm {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                last_request: Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(ClientError::Api {
                    status: 500,
                    message: message.to_string(),
                }),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for StubLlm {
        fn default_model(&self) -> &str {
            "stub-model"
        }

        fn embedding_model(&self) -> &str {
            "stub-embedding"
        }

        async fn complete(&self, request: &CompletionRequest) -> ClientResult<String> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(ClientError::Network(e.to_string())),
            }
        }

        async fn embed(&self, text: &str) -> ClientResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }
}
