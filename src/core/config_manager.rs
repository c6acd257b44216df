// src/core/config_manager.rs
//! Layered configuration: defaults, then the optional `config.yaml` section for the
//! current environment, then environment variables. Secrets only come from the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Supabase,
}

impl StorageBackend {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "supabase" => Ok(StorageBackend::Supabase),
            other => anyhow::bail!("Unknown storage backend '{}'. Use sqlite or supabase", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cassidy: CassidyConfig,
    pub llm: LlmConfig,
    /// Direct Postgres connection for the migration runner.
    pub database_url: Option<String>,
    /// Base URL of a deployed instance, used by smoke/monitor/score/cleanup.
    pub service_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CassidyConfig {
    pub profile_workflow_url: Option<String>,
    pub company_workflow_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub embeddings_enabled: bool,
}

/// Non-secret settings accepted in `config.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    port: Option<u16>,
    storage_backend: Option<String>,
    sqlite_path: Option<PathBuf>,
    supabase_url: Option<String>,
    cassidy_profile_workflow_url: Option<String>,
    cassidy_company_workflow_url: Option<String>,
    llm_base_url: Option<String>,
    llm_model: Option<String>,
    embedding_model: Option<String>,
    embeddings_enabled: Option<bool>,
    service_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: FileSettings,
    production: FileSettings,
}

impl ConfigManager {
    /// Load from the process environment and `./config.yaml` when present.
    pub fn load() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", environment);

        let config_path = Path::new(CONFIG_FILE);
        let file = if config_path.exists() {
            Some(std::fs::read_to_string(config_path).context("Failed to read config.yaml")?)
        } else {
            None
        };

        Self::from_sources(&environment, file.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(environment: &str, yaml: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match yaml {
            Some(content) => serde_yaml::from_str(content).context("Failed to parse config.yaml")?,
            None => ConfigFile::default(),
        };
        let settings = match environment {
            "production" => file.production,
            _ => file.local,
        };

        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT").or_else(|| var("ROCKET_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got '{}'", raw))?,
            None => settings.port.unwrap_or(DEFAULT_PORT),
        };

        let backend = match var("STORAGE_BACKEND").or(settings.storage_backend) {
            Some(raw) => StorageBackend::parse(&raw)?,
            None => StorageBackend::Sqlite,
        };

        let embeddings_enabled = match var("EMBEDDINGS_ENABLED") {
            Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"),
            None => settings.embeddings_enabled.unwrap_or(false),
        };

        Ok(Self {
            environment: environment.to_string(),
            server: ServerConfig {
                port,
                api_key: var("API_KEY"),
            },
            storage: StorageConfig {
                backend,
                sqlite_path: var("SQLITE_PATH")
                    .map(PathBuf::from)
                    .or(settings.sqlite_path)
                    .unwrap_or_else(|| PathBuf::from("data/linkedin_scorer.db")),
                supabase_url: var("SUPABASE_URL").or(settings.supabase_url),
                supabase_service_key: var("SUPABASE_SERVICE_KEY"),
            },
            cassidy: CassidyConfig {
                profile_workflow_url: var("CASSIDY_PROFILE_WORKFLOW_URL")
                    .or(settings.cassidy_profile_workflow_url),
                company_workflow_url: var("CASSIDY_COMPANY_WORKFLOW_URL")
                    .or(settings.cassidy_company_workflow_url),
                api_key: var("CASSIDY_API_KEY"),
            },
            llm: LlmConfig {
                api_key: var("LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")),
                base_url: var("LLM_BASE_URL").or(settings.llm_base_url),
                model: var("LLM_MODEL").or(settings.llm_model),
                embedding_model: var("EMBEDDING_MODEL").or(settings.embedding_model),
                embeddings_enabled,
            },
            database_url: var("DATABASE_URL"),
            service_base_url: var("SERVICE_BASE_URL")
                .or(settings.service_base_url)
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
        })
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.server
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("API_KEY environment variable not set"))
    }

    /// Resolves a relative SQLite path against the working directory.
    pub fn sqlite_path_absolute(&self) -> Result<PathBuf> {
        let path = &self.storage.sqlite_path;
        if path.is_absolute() {
            return Ok(path.clone());
        }
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(current_dir.join(path))
    }
}
