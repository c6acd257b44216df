// src/ops/monitor.rs
//! Waits for a deployment to answer healthy on `/health`.

use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::core::ServiceClient;
use crate::types::HealthResponse;

pub async fn wait_until_healthy(
    client: &ServiceClient,
    interval: Duration,
    timeout: Duration,
) -> Result<HealthResponse> {
    let started = Instant::now();
    let mut last_problem = String::from("no response yet");

    loop {
        match client.health().await {
            Ok(health) if health.is_healthy() => {
                info!(
                    base_url = client.base_url(),
                    version = %health.version,
                    storage = %health.storage,
                    elapsed_s = started.elapsed().as_secs(),
                    "Deployment is healthy"
                );
                return Ok(health);
            }
            Ok(health) => {
                last_problem = format!("status {}", health.status);
                warn!(base_url = client.base_url(), status = %health.status, "Deployment not healthy yet");
            }
            Err(e) => {
                last_problem = e.to_string();
                warn!(base_url = client.base_url(), error = %e, "Health check failed");
            }
        }

        if started.elapsed() + interval > timeout {
            anyhow::bail!(
                "Deployment at {} not healthy after {:?}: {}",
                client.base_url(),
                timeout,
                last_problem
            );
        }
        tokio::time::sleep(interval).await;
    }
}
