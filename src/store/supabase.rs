// src/store/supabase.rs
//! Production backend: Supabase tables through PostgREST.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{ProfileEmbedding, ProfileStore};
use crate::clients::supabase::eq;
use crate::clients::{ClientError, SupabaseClient};
use crate::error::{AppError, AppResult};
use crate::types::{Company, Profile, PromptTemplate, ScoringJob};

const PROFILES: &str = "profiles";
const COMPANIES: &str = "companies";
const TEMPLATES: &str = "prompt_templates";
const JOBS: &str = "scoring_jobs";
const EMBEDDINGS: &str = "profile_embeddings";

pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn fetch_one<T: DeserializeOwned>(&self, table: &str, column: &str, value: &str) -> AppResult<Option<T>> {
        let row = self
            .client
            .select_one(table, &[(column, eq(value))])
            .await
            .map_err(storage)?;
        row.map(|row| serde_json::from_value(row).map_err(AppError::from))
            .transpose()
    }

    async fn insert_unique_url<T: Serialize>(&self, table: &str, record: &T) -> AppResult<bool> {
        let inserted = self
            .client
            .insert_if_absent(table, "linkedin_url", &serde_json::to_value(record)?)
            .await
            .map_err(storage)?;
        Ok(!inserted.is_empty())
    }

    async fn insert_row<T: Serialize>(&self, table: &str, record: &T) -> AppResult<()> {
        self.client
            .insert(table, &serde_json::to_value(record)?)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn update_row<T: Serialize>(&self, table: &str, kind: &str, id: &str, record: &T) -> AppResult<()> {
        let updated = self
            .client
            .update(table, &[("id", eq(id))], &serde_json::to_value(record)?)
            .await
            .map_err(storage)?;
        if updated.is_empty() {
            return Err(AppError::not_found(kind, id));
        }
        Ok(())
    }
}

fn storage(err: ClientError) -> AppError {
    AppError::Storage(err.to_string())
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}

/// pgvector columns come back from PostgREST as text like `[0.1,0.2]`.
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn decode_embedding(mut row: Value) -> AppResult<ProfileEmbedding> {
    if let Some(text) = row.get("embedding").and_then(Value::as_str) {
        let parsed: Vec<f32> = serde_json::from_str(text)?;
        row["embedding"] = serde_json::to_value(parsed)?;
    }
    Ok(serde_json::from_value(row)?)
}

#[async_trait]
impl ProfileStore for SupabaseStore {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn health_check(&self) -> AppResult<()> {
        self.client.ping(PROFILES).await.map_err(storage)
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<bool> {
        self.insert_unique_url(PROFILES, profile).await
    }

    async fn update_profile(&self, profile: &Profile) -> AppResult<()> {
        self.update_row(PROFILES, "Profile", &profile.id, profile).await
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        self.fetch_one(PROFILES, "id", id).await
    }

    async fn find_profile_by_url(&self, linkedin_url: &str) -> AppResult<Option<Profile>> {
        self.fetch_one(PROFILES, "linkedin_url", linkedin_url).await
    }

    async fn list_profiles(&self, limit: u32, offset: u32) -> AppResult<Vec<Profile>> {
        let rows = self
            .client
            .select(
                PROFILES,
                &[
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await
            .map_err(storage)?;
        decode_rows(rows)
    }

    async fn delete_profile(&self, id: &str) -> AppResult<bool> {
        let by_profile = [("profile_id", eq(id))];
        self.client.delete(JOBS, &by_profile).await.map_err(storage)?;
        self.client
            .delete(EMBEDDINGS, &by_profile)
            .await
            .map_err(storage)?;
        let removed = self
            .client
            .delete(PROFILES, &[("id", eq(id))])
            .await
            .map_err(storage)?;
        Ok(removed > 0)
    }

    async fn insert_company(&self, company: &Company) -> AppResult<bool> {
        self.insert_unique_url(COMPANIES, company).await
    }

    async fn update_company(&self, company: &Company) -> AppResult<()> {
        self.update_row(COMPANIES, "Company", &company.id, company).await
    }

    async fn get_company(&self, id: &str) -> AppResult<Option<Company>> {
        self.fetch_one(COMPANIES, "id", id).await
    }

    async fn find_company_by_url(&self, linkedin_url: &str) -> AppResult<Option<Company>> {
        self.fetch_one(COMPANIES, "linkedin_url", linkedin_url).await
    }

    async fn insert_template(&self, template: &PromptTemplate) -> AppResult<()> {
        self.insert_row(TEMPLATES, template).await
    }

    async fn get_template(&self, id: &str) -> AppResult<Option<PromptTemplate>> {
        self.fetch_one(TEMPLATES, "id", id).await
    }

    async fn list_templates(
        &self,
        category: Option<&str>,
        active_only: bool,
    ) -> AppResult<Vec<PromptTemplate>> {
        let mut filters = vec![("order", "created_at.desc".to_string())];
        if let Some(category) = category {
            filters.push(("category", eq(category.to_lowercase())));
        }
        if active_only {
            filters.push(("is_active", eq(true)));
        }
        let rows = self.client.select(TEMPLATES, &filters).await.map_err(storage)?;
        decode_rows(rows)
    }

    async fn insert_job(&self, job: &ScoringJob) -> AppResult<()> {
        self.insert_row(JOBS, job).await
    }

    async fn update_job(&self, job: &ScoringJob) -> AppResult<()> {
        self.update_row(JOBS, "Scoring job", &job.id, job).await
    }

    async fn get_job(&self, id: &str) -> AppResult<Option<ScoringJob>> {
        self.fetch_one(JOBS, "id", id).await
    }

    async fn upsert_embedding(&self, embedding: &ProfileEmbedding) -> AppResult<()> {
        let mut row = serde_json::to_value(embedding)?;
        row["embedding"] = Value::String(vector_literal(&embedding.embedding));
        self.client
            .upsert(EMBEDDINGS, "profile_id", &row)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn get_embedding(&self, profile_id: &str) -> AppResult<Option<ProfileEmbedding>> {
        let row = self
            .client
            .select_one(EMBEDDINGS, &[("profile_id", eq(profile_id))])
            .await
            .map_err(storage)?;
        row.map(decode_embedding).transpose()
    }
}
