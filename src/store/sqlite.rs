// src/store/sqlite.rs
//! SQLite backend used for local runs and tests.
//!
//! Each record is stored as its JSON document in a `data` column, with the
//! columns needed for lookups and ordering kept alongside.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use super::{ProfileEmbedding, ProfileStore};
use crate::error::{AppError, AppResult};
use crate::timestamp;
use crate::types::{Company, Profile, PromptTemplate, ScoringJob};

pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        linkedin_url TEXT NOT NULL UNIQUE,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        id TEXT PRIMARY KEY,
        linkedin_url TEXT NOT NULL UNIQUE,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prompt_templates (
        id TEXT PRIMARY KEY,
        category TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scoring_jobs (
        id TEXT PRIMARY KEY,
        profile_id TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profile_embeddings (
        profile_id TEXT PRIMARY KEY,
        model TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_profiles_created_at ON profiles(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_templates_category ON prompt_templates(category)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_profile_id ON scoring_jobs(profile_id)",
];

impl SqliteStore {
    /// Opens (creating if needed) a database file.
    pub async fn new(database_path: &Path) -> AppResult<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Storage(format!(
                        "failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await?;
        info!(path = %database_path.display(), "SQLite connection established");

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database. One connection, so every query sees the same data.
    pub async fn in_memory() -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("SQLite schema ready");
        Ok(())
    }

    async fn fetch_doc<T: DeserializeOwned>(&self, sql: &str, key: &str) -> AppResult<Option<T>> {
        let data: Option<String> = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        data.map(|raw| decode(&raw)).transpose()
    }
}

fn encode<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    Ok(serde_json::from_str(raw)?)
}

fn ensure_updated(rows: u64, kind: &str, id: &str) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::not_found(kind, id));
    }
    Ok(())
}

#[async_trait]
impl ProfileStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_profile(&self, profile: &Profile) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO profiles (id, linkedin_url, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(linkedin_url) DO NOTHING",
        )
        .bind(&profile.id)
        .bind(&profile.linkedin_url)
        .bind(encode(profile)?)
        .bind(timestamp::format_micros(&profile.created_at))
        .bind(timestamp::format_micros(&profile.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(&self, profile: &Profile) -> AppResult<()> {
        let result = sqlx::query("UPDATE profiles SET data = ?, updated_at = ? WHERE id = ?")
            .bind(encode(profile)?)
            .bind(timestamp::format_micros(&profile.updated_at))
            .bind(&profile.id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), "Profile", &profile.id)
    }

    async fn get_profile(&self, id: &str) -> AppResult<Option<Profile>> {
        self.fetch_doc("SELECT data FROM profiles WHERE id = ?", id).await
    }

    async fn find_profile_by_url(&self, linkedin_url: &str) -> AppResult<Option<Profile>> {
        self.fetch_doc("SELECT data FROM profiles WHERE linkedin_url = ?", linkedin_url)
            .await
    }

    async fn list_profiles(&self, limit: u32, offset: u32) -> AppResult<Vec<Profile>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT data FROM profiles ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|raw| decode(raw)).collect()
    }

    async fn delete_profile(&self, id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM scoring_jobs WHERE profile_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM profile_embeddings WHERE profile_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_company(&self, company: &Company) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO companies (id, linkedin_url, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(linkedin_url) DO NOTHING",
        )
        .bind(&company.id)
        .bind(&company.linkedin_url)
        .bind(encode(company)?)
        .bind(timestamp::format_micros(&company.created_at))
        .bind(timestamp::format_micros(&company.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_company(&self, company: &Company) -> AppResult<()> {
        let result = sqlx::query("UPDATE companies SET data = ?, updated_at = ? WHERE id = ?")
            .bind(encode(company)?)
            .bind(timestamp::format_micros(&company.updated_at))
            .bind(&company.id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), "Company", &company.id)
    }

    async fn get_company(&self, id: &str) -> AppResult<Option<Company>> {
        self.fetch_doc("SELECT data FROM companies WHERE id = ?", id).await
    }

    async fn find_company_by_url(&self, linkedin_url: &str) -> AppResult<Option<Company>> {
        self.fetch_doc("SELECT data FROM companies WHERE linkedin_url = ?", linkedin_url)
            .await
    }

    async fn insert_template(&self, template: &PromptTemplate) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO prompt_templates (id, category, is_active, data, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&template.id)
        .bind(&template.category)
        .bind(template.is_active)
        .bind(encode(template)?)
        .bind(timestamp::format_micros(&template.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_template(&self, id: &str) -> AppResult<Option<PromptTemplate>> {
        self.fetch_doc("SELECT data FROM prompt_templates WHERE id = ?", id)
            .await
    }

    async fn list_templates(
        &self,
        category: Option<&str>,
        active_only: bool,
    ) -> AppResult<Vec<PromptTemplate>> {
        let category = category.map(str::to_lowercase);
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT data FROM prompt_templates
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 = 0 OR is_active = 1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(category)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|raw| decode(raw)).collect()
    }

    async fn insert_job(&self, job: &ScoringJob) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO scoring_jobs (id, profile_id, status, data, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.profile_id)
        .bind(job.status.as_str())
        .bind(encode(job)?)
        .bind(timestamp::format_micros(&job.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(&self, job: &ScoringJob) -> AppResult<()> {
        let result = sqlx::query("UPDATE scoring_jobs SET status = ?, data = ? WHERE id = ?")
            .bind(job.status.as_str())
            .bind(encode(job)?)
            .bind(&job.id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), "Scoring job", &job.id)
    }

    async fn get_job(&self, id: &str) -> AppResult<Option<ScoringJob>> {
        self.fetch_doc("SELECT data FROM scoring_jobs WHERE id = ?", id).await
    }

    async fn upsert_embedding(&self, embedding: &ProfileEmbedding) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profile_embeddings (profile_id, model, data, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(profile_id) DO UPDATE SET
                model = excluded.model,
                data = excluded.data,
                created_at = excluded.created_at
            "#,
        )
        .bind(&embedding.profile_id)
        .bind(&embedding.model)
        .bind(encode(embedding)?)
        .bind(timestamp::format_micros(&embedding.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_embedding(&self, profile_id: &str) -> AppResult<Option<ProfileEmbedding>> {
        self.fetch_doc(
            "SELECT data FROM profile_embeddings WHERE profile_id = ?",
            profile_id,
        )
        .await
    }
}
