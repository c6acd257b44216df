// src/cli.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::clients::SupabaseClient;
use crate::core::{ConfigManager, ServiceClient};
use crate::ops::{cleanup, migrate, monitor, repair, smoke, JobPoller};
use crate::types::JobStatus;
use crate::web;

#[derive(Parser)]
#[command(name = "linkedin-scorer")]
#[command(about = "LinkedIn profile ingestion and LLM scoring service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply SQL migrations to Postgres (DATABASE_URL)
    Migrate {
        #[arg(long)]
        check_only: bool,
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },
    /// Normalize stored timestamps to six fractional digits
    RepairTimestamps {
        #[arg(long)]
        check_only: bool,
        #[arg(long)]
        delete_unrepairable: bool,
        #[arg(long)]
        table: Option<String>,
    },
    /// Run end-to-end checks against a deployment
    Smoke {
        #[command(flatten)]
        remote: RemoteArgs,
        #[arg(long)]
        quick: bool,
        #[arg(long)]
        profile_url: Option<String>,
    },
    /// Wait until a deployment reports healthy
    Monitor {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Create a scoring job on a deployment and wait for it
    Score {
        profile_id: String,
        #[arg(long, conflicts_with = "prompt", required_unless_present = "prompt")]
        template_id: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        enhanced: bool,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Delete profiles on a deployment
    Cleanup {
        ids: Vec<String>,
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Stop at the first failed deletion
        #[arg(long)]
        strict: bool,
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

#[derive(Args, Clone)]
pub struct RemoteArgs {
    /// Defaults to SERVICE_BASE_URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
    /// Seconds between polls
    #[arg(long, default_value_t = 5)]
    pub interval: u64,
}

impl RemoteArgs {
    fn client(&self, config: &ConfigManager) -> Result<ServiceClient> {
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| config.service_base_url.clone());
        ServiceClient::new(&base_url, config.server.api_key.clone())
    }

    fn poller(&self) -> JobPoller {
        JobPoller::new(Duration::from_secs(self.interval), Duration::from_secs(self.timeout))
    }
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = ConfigManager::load()?;

    match cli.command {
        Command::Serve { port } => {
            let state = web::build_state(&config).await?;
            web::start_web_server(state, port.unwrap_or(config.server.port)).await
        }

        Command::Migrate { check_only, dir } => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL environment variable not set")?;
            let report = migrate::run(database_url, &dir, check_only).await?;
            for version in &report.pending {
                let state = if report.applied.contains(version) { "applied" } else { "pending" };
                println!("{:<40} {}", version, state);
            }
            println!(
                "{} already applied, {} applied now, {} pending",
                report.already_applied.len(),
                report.applied.len(),
                report.pending.len() - report.applied.len()
            );
            Ok(())
        }

        Command::RepairTimestamps {
            check_only,
            delete_unrepairable,
            table,
        } => {
            let url = config
                .storage
                .supabase_url
                .as_deref()
                .context("SUPABASE_URL environment variable not set")?;
            let key = config
                .storage
                .supabase_service_key
                .clone()
                .context("SUPABASE_SERVICE_KEY environment variable not set")?;
            let client = SupabaseClient::new(url, key)?;
            let targets = repair::targets_for(table.as_deref())?;
            let options = repair::RepairOptions {
                check_only,
                delete_unrepairable,
            };
            let report = repair::run(&client, &targets, options).await?;
            println!(
                "scanned {} values: {} fixable, {} unrepairable, {} patched, {} rows deleted",
                report.scanned, report.fixable, report.unrepairable, report.patched, report.deleted
            );
            Ok(())
        }

        Command::Smoke {
            remote,
            quick,
            profile_url,
        } => {
            let client = remote.client(&config)?;
            let mut options = smoke::SmokeOptions {
                quick,
                poller: remote.poller(),
                ..Default::default()
            };
            if let Some(url) = profile_url {
                options.profile_url = url;
            }
            let report = smoke::run(&client, &options).await?;
            for check in &report.checks {
                let mark = if check.passed { "PASS" } else { "FAIL" };
                println!("{} {:<32} {}", mark, check.name, check.detail);
            }
            if !report.passed() {
                anyhow::bail!("{} smoke check(s) failed", report.failures().count());
            }
            info!(checks = report.checks.len(), cleaned_up = report.cleaned_up.len(), "Smoke tests passed");
            Ok(())
        }

        Command::Monitor { remote } => {
            let client = remote.client(&config)?;
            let health = monitor::wait_until_healthy(
                &client,
                Duration::from_secs(remote.interval),
                Duration::from_secs(remote.timeout),
            )
            .await?;
            println!("{} healthy: version {}, storage {}", client.base_url(), health.version, health.storage);
            Ok(())
        }

        Command::Score {
            profile_id,
            template_id,
            prompt,
            enhanced,
            remote,
        } => {
            let client = remote.client(&config)?;
            let created = client
                .score(&profile_id, template_id.as_deref(), prompt.as_deref(), enhanced)
                .await?;
            info!(job_id = %created.job_id, "Scoring job created, polling");
            let job = remote.poller().wait_for(&client, &created.job_id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            if job.status == JobStatus::Failed {
                anyhow::bail!("Scoring job {} failed", job.job_id);
            }
            Ok(())
        }

        Command::Cleanup {
            mut ids,
            csv,
            strict,
            remote,
        } => {
            if let Some(path) = csv {
                ids.extend(cleanup::read_ids_csv(&path)?);
            }
            if ids.is_empty() {
                anyhow::bail!("No profile ids given. Pass ids or --csv <file>");
            }
            let client = remote.client(&config)?;
            let report = cleanup::delete_profiles(&client, &ids, strict).await?;
            println!(
                "deleted {}, already absent {}, failed {}",
                report.deleted.len(),
                report.missing.len(),
                report.errors.len()
            );
            for (id, message) in &report.errors {
                error!(profile_id = %id, error = %message, "Deletion failed");
            }
            if !report.is_clean() {
                anyhow::bail!("{} deletion(s) failed", report.errors.len());
            }
            Ok(())
        }
    }
}
