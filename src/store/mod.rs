// src/store/mod.rs
//! Persistence for profiles, companies, prompt templates, scoring jobs and embeddings.

pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::timestamp;
use crate::types::{Company, Profile, PromptTemplate, ScoringJob};

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileEmbedding {
    pub profile_id: String,
    pub model: String,
    pub embedding: Vec<f32>,
    #[serde(with = "timestamp::micros")]
    pub created_at: DateTime<Utc>,
}

impl ProfileEmbedding {
    pub fn new(profile_id: String, model: String, embedding: Vec<f32>) -> Self {
        Self {
            profile_id,
            model,
            embedding,
            created_at: timestamp::now(),
        }
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Short name reported by the health endpoint.
    fn backend_name(&self) -> &'static str;

    async fn health_check(&self) -> AppResult<()>;

    /// Returns false, leaving the stored row untouched, when the URL is already taken.
    async fn insert_profile(&self, profile: &Profile) -> AppResult<bool>;
    async fn update_profile(&self, profile: &Profile) -> AppResult<()>;
    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>>;
    async fn find_profile_by_url(&self, linkedin_url: &str) -> AppResult<Option<Profile>>;
    /// Newest first.
    async fn list_profiles(&self, limit: u32, offset: u32) -> AppResult<Vec<Profile>>;
    /// Removes the profile with its jobs and embedding. Returns false when nothing matched.
    async fn delete_profile(&self, id: &str) -> AppResult<bool>;

    /// Returns false when a company with the same URL is already stored.
    async fn insert_company(&self, company: &Company) -> AppResult<bool>;
    async fn update_company(&self, company: &Company) -> AppResult<()>;
    async fn get_company(&self, id: &str) -> AppResult<Option<Company>>;
    async fn find_company_by_url(&self, linkedin_url: &str) -> AppResult<Option<Company>>;

    async fn insert_template(&self, template: &PromptTemplate) -> AppResult<()>;
    async fn get_template(&self, id: &str) -> AppResult<Option<PromptTemplate>>;
    async fn list_templates(
        &self,
        category: Option<&str>,
        active_only: bool,
    ) -> AppResult<Vec<PromptTemplate>>;

    async fn insert_job(&self, job: &ScoringJob) -> AppResult<()>;
    async fn update_job(&self, job: &ScoringJob) -> AppResult<()>;
    async fn get_job(&self, id: &str) -> AppResult<Option<ScoringJob>>;

    async fn upsert_embedding(&self, embedding: &ProfileEmbedding) -> AppResult<()>;
    async fn get_embedding(&self, profile_id: &str) -> AppResult<Option<ProfileEmbedding>>;
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
        assert_eq!(clamp_limit(Some(50)), 50);
    }
}
