// src/ops/poller.rs
//! Fixed-interval polling of scoring jobs on a deployed instance.

use anyhow::Result;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::ServiceClient;
use crate::types::JobStatusResponse;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
pub struct JobPoller {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl JobPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Polls until the job is `completed` or `failed`. Errors on timeout or on a failed GET.
    pub async fn wait_for(&self, client: &ServiceClient, job_id: &str) -> Result<JobStatusResponse> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let job = client.get_job(job_id).await?;
            debug!(job_id, attempts, status = job.status.as_str(), "Polled scoring job");

            if job.status.is_terminal() {
                info!(
                    job_id,
                    status = job.status.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scoring job finished"
                );
                return Ok(job);
            }

            if started.elapsed() + self.interval > self.timeout {
                anyhow::bail!(
                    "Timed out after {:?} waiting for job {} (last status: {})",
                    self.timeout,
                    job_id,
                    job.status.as_str()
                );
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Polls several jobs concurrently. Results come back in input order.
    pub async fn wait_all(
        &self,
        client: &ServiceClient,
        job_ids: &[String],
    ) -> Vec<(String, Result<JobStatusResponse>)> {
        join_all(job_ids.iter().map(|job_id| async move {
            (job_id.clone(), self.wait_for(client, job_id).await)
        }))
        .await
    }
}
