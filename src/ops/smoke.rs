// src/ops/smoke.rs
//! End-to-end checks against a live deployment. Profiles created during the run are deleted
//! at the end whether or not the checks pass.

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use tracing::{info, warn};

use crate::core::ServiceClient;
use crate::ops::poller::JobPoller;
use crate::types::JobStatus;

pub const LEGACY_PROFILE_URL: &str = "https://www.linkedin.com/pub/john-doe/8/946/143";
pub const DEFAULT_PROFILE_URL: &str = "https://www.linkedin.com/in/williamhgates";

#[derive(Debug, Clone)]
pub struct SmokeOptions {
    pub profile_url: String,
    /// Skips the scoring checks, which need a working LLM.
    pub quick: bool,
    pub poller: JobPoller,
}

impl Default for SmokeOptions {
    fn default() -> Self {
        Self {
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            quick: false,
            poller: JobPoller::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct SmokeReport {
    pub checks: Vec<CheckOutcome>,
    pub cleaned_up: Vec<String>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }

    fn record(&mut self, name: &'static str, passed: bool, detail: impl Into<String>) {
        let detail = detail.into();
        if passed {
            info!(check = name, %detail, "Smoke check passed");
        } else {
            warn!(check = name, %detail, "Smoke check failed");
        }
        self.checks.push(CheckOutcome { name, passed, detail });
    }

    fn expect_status(&mut self, name: &'static str, actual: StatusCode, expected: &[StatusCode]) {
        let passed = expected.contains(&actual);
        self.record(name, passed, format!("got HTTP {}", actual.as_u16()));
    }
}

pub async fn run(client: &ServiceClient, options: &SmokeOptions) -> Result<SmokeReport> {
    let mut report = SmokeReport::default();
    let mut created: Vec<String> = Vec::new();

    match client.health().await {
        Ok(health) => report.record("health", health.is_healthy(), format!("status {}", health.status)),
        Err(e) => report.record("health", false, e.to_string()),
    }

    let legacy = client
        .post_raw("/profiles", &json!({"linkedin_url": LEGACY_PROFILE_URL}))
        .await?;
    report.expect_status("legacy_url_rejected", legacy.status, &[StatusCode::BAD_REQUEST]);

    let modern = client
        .post_raw("/profiles", &json!({"linkedin_url": options.profile_url}))
        .await?;
    report.expect_status(
        "modern_url_accepted",
        modern.status,
        &[StatusCode::CREATED, StatusCode::OK],
    );
    let profile_id = modern.body["id"].as_str().map(String::from);
    if modern.status == StatusCode::CREATED {
        if let Some(id) = &profile_id {
            created.push(id.clone());
        }
    }

    if !options.quick {
        match &profile_id {
            Some(id) => scoring_checks(client, options, id, &mut report).await?,
            None => report.record("scoring", false, "no profile id to score"),
        }
    }

    for id in created {
        match client.delete_profile(&id).await {
            Ok(_) => report.cleaned_up.push(id),
            Err(e) => warn!(profile_id = %id, error = %e, "Failed to clean up smoke profile"),
        }
    }

    Ok(report)
}

async fn scoring_checks(
    client: &ServiceClient,
    options: &SmokeOptions,
    profile_id: &str,
    report: &mut SmokeReport,
) -> Result<()> {
    let endpoint = format!("/profiles/{}/score", profile_id);

    let both = client
        .post_raw(&endpoint, &json!({"template_id": "smoke", "prompt": "Rate this profile"}))
        .await?;
    report.expect_status("both_selectors_rejected", both.status, &[StatusCode::UNPROCESSABLE_ENTITY]);

    let neither = client.post_raw(&endpoint, &json!({})).await?;
    report.expect_status("no_selector_rejected", neither.status, &[StatusCode::UNPROCESSABLE_ENTITY]);

    let missing = client
        .post_raw(&endpoint, &json!({"template_id": uuid::Uuid::new_v4().to_string()}))
        .await?;
    report.expect_status("unknown_template_not_found", missing.status, &[StatusCode::NOT_FOUND]);

    let job = client
        .score(
            profile_id,
            None,
            Some("Score this profile from 0 to 100 for a senior engineering role. Reply in JSON with score and summary."),
            false,
        )
        .await?;
    match options.poller.wait_for(client, &job.job_id).await {
        Ok(done) => {
            let has_result = done.result.as_ref().is_some_and(|r| !r.is_empty());
            let passed = done.status == JobStatus::Completed && has_result && done.completed_at.is_some();
            report.record(
                "scoring_job_completes",
                passed,
                format!("job {} ended {}", done.job_id, done.status.as_str()),
            );
        }
        Err(e) => report.record("scoring_job_completes", false, e.to_string()),
    }
    Ok(())
}
