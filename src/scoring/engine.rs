// src/scoring/engine.rs
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{parser, prompt};
use crate::clients::LlmBackend;
use crate::error::{AppError, AppResult};
use crate::linkedin;
use crate::store::ProfileStore;
use crate::types::{Company, PromptSelection, PromptTemplate, ScoreRequest, ScoringJob};

/// Creates scoring jobs and runs each one on its own tokio task.
#[derive(Clone)]
pub struct ScoringEngine {
    store: Arc<dyn ProfileStore>,
    llm: Arc<dyn LlmBackend>,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn ProfileStore>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { store, llm }
    }

    /// Validates the request, stores a pending job and starts it in the background.
    pub async fn submit(
        &self,
        profile_id: &str,
        request: &ScoreRequest,
        enhanced: bool,
    ) -> AppResult<ScoringJob> {
        let selection = request.selection()?;

        self.store
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", profile_id))?;
        if let PromptSelection::Template(template_id) = &selection {
            self.active_template(template_id).await?;
        }

        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);
        let job = ScoringJob::new(profile_id.to_string(), selection, enhanced, model);
        self.store.insert_job(&job).await?;
        info!(job_id = %job.id, profile_id, enhanced, "Scoring job created");

        self.spawn(job.clone());
        Ok(job)
    }

    pub fn spawn(&self, job: ScoringJob) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let job_id = job.id.clone();
            if let Err(e) = engine.run_job(job).await {
                error!(job_id = %job_id, error = %e, "Scoring job could not be recorded");
            }
        })
    }

    /// Drives a pending job to a terminal state. Errors here are storage failures;
    /// scoring failures end up on the job itself.
    pub async fn run_job(&self, mut job: ScoringJob) -> AppResult<ScoringJob> {
        job.mark_processing()?;
        if let Err(e) = self.store.update_job(&job).await {
            self.record_start_failure(&mut job, &e).await;
            return Err(e);
        }

        match self.execute(&job).await {
            Ok(result) => {
                job.mark_completed(result)?;
                info!(job_id = %job.id, "Scoring job completed");
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Scoring job failed");
                job.mark_failed(e.to_string())?;
            }
        }
        self.store.update_job(&job).await?;
        Ok(job)
    }

    /// Best effort, so pollers see `failed` instead of a job stuck in `pending`.
    async fn record_start_failure(&self, job: &mut ScoringJob, cause: &AppError) {
        if job.mark_failed(format!("Could not start scoring job: {}", cause)).is_err() {
            return;
        }
        if let Err(e) = self.store.update_job(job).await {
            error!(job_id = %job.id, error = %e, "Could not record scoring job failure");
        }
    }

    async fn execute(&self, job: &ScoringJob) -> AppResult<Map<String, Value>> {
        let profile = self
            .store
            .get_profile(&job.profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", &job.profile_id))?;
        let template = match &job.template_id {
            Some(id) => Some(self.active_template(id).await?),
            None => None,
        };
        let company = if job.enhanced {
            self.current_company(profile.current_company_url.as_deref())
                .await
        } else {
            None
        };

        let request = prompt::build_request(job, template.as_ref(), &profile, company.as_ref());
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.llm.default_model().to_string());
        let text = self.llm.complete(&request).await?;
        if text.trim().is_empty() {
            return Err(AppError::Upstream("LLM returned an empty response".to_string()));
        }

        let mut result = parser::parse_result(&text);
        result.insert("model".to_string(), Value::String(model));
        Ok(result)
    }

    async fn active_template(&self, id: &str) -> AppResult<PromptTemplate> {
        self.store
            .get_template(id)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| AppError::not_found("Template", id))
    }

    async fn current_company(&self, url: Option<&str>) -> Option<Company> {
        let url = linkedin::parse_company(url?).ok()?.normalized();
        match self.store.find_company_by_url(&url).await {
            Ok(company) => company,
            Err(e) => {
                warn!(url = %url, error = %e, "Company lookup failed, scoring without it");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::StubLlm;
    use crate::store::SqliteStore;
    use crate::types::{JobStatus, NewTemplate, Profile};
    use std::time::Duration;

    async fn setup(llm: StubLlm) -> (ScoringEngine, Arc<SqliteStore>, Arc<StubLlm>, Profile) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let mut profile = Profile::pending("https://www.linkedin.com/in/jane".into());
        profile.full_name = Some("Jane Doe".into());
        profile.current_company_url = Some("https://www.linkedin.com/company/acme".into());
        store.insert_profile(&profile).await.unwrap();
        let llm = Arc::new(llm);
        (
            ScoringEngine::new(store.clone(), llm.clone()),
            store,
            llm,
            profile,
        )
    }

    fn prompt_request(prompt: &str) -> ScoreRequest {
        ScoreRequest {
            template_id: None,
            prompt: Some(prompt.to_string()),
            model: None,
        }
    }

    async fn wait_terminal(store: &SqliteStore, job_id: &str) -> ScoringJob {
        for _ in 0..200 {
            let job = store.get_job(job_id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    #[tokio::test]
    async fn test_submit_runs_job_to_completion() {
        let (engine, store, _, profile) =
            setup(StubLlm::replying(r#"{"score": "88", "summary": "great"}"#)).await;

        let job = engine
            .submit(&profile.id, &prompt_request("Rate {{name}}"), false)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Pending);

        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.started_at.is_some());
        let result = done.result.unwrap();
        assert_eq!(result["score"], 88);
        assert_eq!(result["model"], "stub-model");
    }

    #[tokio::test]
    async fn test_submit_validation_and_missing_records() {
        let (engine, _, _, profile) = setup(StubLlm::replying("{}")).await;

        let both = ScoreRequest {
            template_id: Some("t".into()),
            prompt: Some("p".into()),
            model: None,
        };
        assert!(matches!(
            engine.submit(&profile.id, &both, false).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            engine.submit(&profile.id, &ScoreRequest::default(), false).await,
            Err(AppError::Validation(_))
        ));

        let missing_template = ScoreRequest {
            template_id: Some("does-not-exist".into()),
            prompt: None,
            model: None,
        };
        assert!(matches!(
            engine.submit(&profile.id, &missing_template, false).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            engine.submit("nobody", &prompt_request("x"), false).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_template_is_not_found() {
        let (engine, store, _, profile) = setup(StubLlm::replying("{}")).await;
        let template = NewTemplate {
            name: "Old".into(),
            category: "sales".into(),
            prompt: "Rate".into(),
            is_active: Some(false),
            metadata: None,
        }
        .into_template()
        .unwrap();
        store.insert_template(&template).await.unwrap();

        let request = ScoreRequest {
            template_id: Some(template.id.clone()),
            prompt: None,
            model: None,
        };
        assert!(matches!(
            engine.submit(&profile.id, &request, false).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_failure_marks_job_failed() {
        let (engine, store, _, profile) = setup(StubLlm::failing("provider down")).await;
        let job = ScoringJob::new(
            profile.id.clone(),
            PromptSelection::Prompt("Rate".into()),
            false,
            None,
        );
        store.insert_job(&job).await.unwrap();

        let finished = engine.run_job(job).await.unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished.error.unwrap().contains("provider down"));
        assert!(finished.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_completion_fails_job() {
        let (engine, store, _, profile) = setup(StubLlm::replying("   ")).await;
        let job = ScoringJob::new(
            profile.id.clone(),
            PromptSelection::Prompt("Rate".into()),
            false,
            None,
        );
        store.insert_job(&job).await.unwrap();
        let finished = engine.run_job(job).await.unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_enhanced_job_uses_stored_company() {
        let (engine, store, llm, profile) = setup(StubLlm::replying(r#"{"score": 70}"#)).await;
        let mut company = Company::new("https://www.linkedin.com/company/acme".into());
        company.name = Some("Acme Corp".into());
        store.insert_company(&company).await.unwrap();

        let job = ScoringJob::new(
            profile.id.clone(),
            PromptSelection::Prompt("Rate".into()),
            true,
            None,
        );
        store.insert_job(&job).await.unwrap();
        let finished = engine.run_job(job).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);

        let sent = llm.last_request.lock().unwrap().clone().unwrap();
        assert!(sent.prompt.contains("Company: Acme Corp"));
        assert!(sent.prompt.contains(prompt::ENHANCED_RUBRIC));
    }

    /// Delegates to SQLite but rejects the first `n` job updates.
    struct RejectingJobUpdates {
        inner: SqliteStore,
        rejections_left: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ProfileStore for RejectingJobUpdates {
        fn backend_name(&self) -> &'static str {
            "rejecting"
        }
        async fn health_check(&self) -> AppResult<()> {
            self.inner.health_check().await
        }
        async fn insert_profile(&self, profile: &Profile) -> AppResult<bool> {
            self.inner.insert_profile(profile).await
        }
        async fn update_profile(&self, profile: &Profile) -> AppResult<()> {
            self.inner.update_profile(profile).await
        }
        async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
            self.inner.get_profile(id).await
        }
        async fn find_profile_by_url(&self, url: &str) -> AppResult<Option<Profile>> {
            self.inner.find_profile_by_url(url).await
        }
        async fn list_profiles(&self, limit: u32, offset: u32) -> AppResult<Vec<Profile>> {
            self.inner.list_profiles(limit, offset).await
        }
        async fn delete_profile(&self, id: &str) -> AppResult<bool> {
            self.inner.delete_profile(id).await
        }
        async fn insert_company(&self, company: &Company) -> AppResult<bool> {
            self.inner.insert_company(company).await
        }
        async fn update_company(&self, company: &Company) -> AppResult<()> {
            self.inner.update_company(company).await
        }
        async fn get_company(&self, id: &str) -> AppResult<Option<Company>> {
            self.inner.get_company(id).await
        }
        async fn find_company_by_url(&self, url: &str) -> AppResult<Option<Company>> {
            self.inner.find_company_by_url(url).await
        }
        async fn insert_template(&self, template: &PromptTemplate) -> AppResult<()> {
            self.inner.insert_template(template).await
        }
        async fn get_template(&self, id: &str) -> AppResult<Option<PromptTemplate>> {
            self.inner.get_template(id).await
        }
        async fn list_templates(&self, category: Option<&str>, active_only: bool) -> AppResult<Vec<PromptTemplate>> {
            self.inner.list_templates(category, active_only).await
        }
        async fn insert_job(&self, job: &ScoringJob) -> AppResult<()> {
            self.inner.insert_job(job).await
        }
        async fn update_job(&self, job: &ScoringJob) -> AppResult<()> {
            use std::sync::atomic::Ordering;
            let left = self.rejections_left.load(Ordering::SeqCst);
            if left > 0 {
                self.rejections_left.store(left - 1, Ordering::SeqCst);
                return Err(AppError::Storage("connection reset".to_string()));
            }
            self.inner.update_job(job).await
        }
        async fn get_job(&self, id: &str) -> AppResult<Option<ScoringJob>> {
            self.inner.get_job(id).await
        }
        async fn upsert_embedding(&self, embedding: &crate::store::ProfileEmbedding) -> AppResult<()> {
            self.inner.upsert_embedding(embedding).await
        }
        async fn get_embedding(&self, profile_id: &str) -> AppResult<Option<crate::store::ProfileEmbedding>> {
            self.inner.get_embedding(profile_id).await
        }
    }

    #[tokio::test]
    async fn test_job_is_marked_failed_when_start_cannot_be_recorded() {
        let store = Arc::new(RejectingJobUpdates {
            inner: SqliteStore::in_memory().await.unwrap(),
            rejections_left: std::sync::atomic::AtomicUsize::new(1),
        });
        let profile = Profile::pending("https://www.linkedin.com/in/jane".into());
        store.insert_profile(&profile).await.unwrap();
        let job = ScoringJob::new(
            profile.id.clone(),
            PromptSelection::Prompt("Rate".into()),
            false,
            None,
        );
        store.insert_job(&job).await.unwrap();

        let engine = ScoringEngine::new(store.clone(), Arc::new(StubLlm::replying("{}")));
        let err = engine.run_job(job.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error.unwrap().contains("connection reset"));
        assert!(stored.completed_at.is_some());
    }
}
