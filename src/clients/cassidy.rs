// src/clients/cassidy.rs
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ensure_success, ClientError, ClientResult, ProfileSource, WorkflowOutcome};
use crate::types::{WorkflowRunEnvelope, WorkflowState};

const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Client for the Cassidy workflows that scrape LinkedIn profiles and companies.
pub struct CassidyClient {
    client: reqwest::Client,
    profile_workflow_url: String,
    company_workflow_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct WorkflowInput<'a> {
    linkedin_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

impl CassidyClient {
    pub fn new(profile_workflow_url: String, api_key: Option<String>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            profile_workflow_url,
            company_workflow_url: None,
            api_key,
        })
    }

    pub fn with_company_workflow(mut self, url: Option<String>) -> Self {
        self.company_workflow_url = url;
        self
    }

    async fn run_workflow(&self, url: &str, input: &WorkflowInput<'_>) -> ClientResult<WorkflowOutcome> {
        info!(workflow = %url, linkedin_url = input.linkedin_url, "Triggering Cassidy workflow");

        let mut request = self.client.post(url).json(input);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = ensure_success(request.send().await?).await?;
        let body: Value = resp.json().await?;
        interpret_response(body)
    }
}

/// Reads a workflow response. Bare objects without a `workflowRun` envelope are
/// treated as a finished payload.
fn interpret_response(body: Value) -> ClientResult<WorkflowOutcome> {
    let has_envelope = body.get("workflowRun").is_some() || body.get("workflow_run").is_some();
    if !has_envelope {
        return match body {
            Value::Object(_) => Ok(WorkflowOutcome::Ready(body)),
            other => Err(ClientError::Parse(format!(
                "unexpected workflow response: {}",
                other
            ))),
        };
    }

    let envelope: WorkflowRunEnvelope = serde_json::from_value(body)?;
    let run = envelope.workflow_run;
    match run.state() {
        WorkflowState::Completed => {
            debug!(run_id = %run.id, actions = run.action_results.len(), "Workflow completed");
            run.payload().map(WorkflowOutcome::Ready).ok_or_else(|| {
                ClientError::Parse(format!("workflow run {} produced no JSON output", run.id))
            })
        }
        WorkflowState::Running => {
            info!(run_id = %run.id, status = %run.status, "Workflow still running, awaiting callback");
            Ok(WorkflowOutcome::Pending { run_id: run.id })
        }
        WorkflowState::Failed => {
            warn!(run_id = %run.id, status = %run.status, "Workflow failed");
            Err(ClientError::WorkflowFailed(run.error.unwrap_or_else(|| {
                format!("run {} ended with status {}", run.id, run.status)
            })))
        }
    }
}

#[async_trait]
impl ProfileSource for CassidyClient {
    async fn fetch_profile(&self, linkedin_url: &str) -> ClientResult<WorkflowOutcome> {
        let input = WorkflowInput {
            linkedin_url,
            kind: None,
        };
        self.run_workflow(&self.profile_workflow_url, &input).await
    }

    async fn fetch_company(&self, linkedin_url: &str) -> ClientResult<WorkflowOutcome> {
        // Without a dedicated company workflow, the profile workflow is asked for a company.
        match &self.company_workflow_url {
            Some(url) => {
                let input = WorkflowInput {
                    linkedin_url,
                    kind: None,
                };
                self.run_workflow(url, &input).await
            }
            None => {
                let input = WorkflowInput {
                    linkedin_url,
                    kind: Some("company"),
                };
                self.run_workflow(&self.profile_workflow_url, &input).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_profile_completed() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "workflowRun": {
                "id": "run_1",
                "status": "COMPLETED",
                "actionResults": [{"output": "{\"full_name\": \"Jane Doe\"}"}]
            }
        });
        let _m = server
            .mock("POST", "/workflows/profile")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(
                json!({"linkedin_url": "https://www.linkedin.com/in/jane"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let client = CassidyClient::new(
            format!("{}/workflows/profile", server.url()),
            Some("secret".to_string()),
        )
        .unwrap();
        let outcome = client
            .fetch_profile("https://www.linkedin.com/in/jane")
            .await
            .unwrap();
        assert_eq!(outcome, WorkflowOutcome::Ready(json!({"full_name": "Jane Doe"})));
    }

    #[tokio::test]
    async fn test_fetch_profile_running_and_failed() {
        let mut server = mockito::Server::new_async().await;
        let _running = server
            .mock("POST", "/running")
            .with_status(200)
            .with_body(r#"{"workflowRun": {"id": "run_2", "status": "RUNNING"}}"#)
            .create_async()
            .await;
        let _failed = server
            .mock("POST", "/failed")
            .with_status(200)
            .with_body(r#"{"workflowRun": {"id": "run_3", "status": "FAILED", "error": "captcha"}}"#)
            .create_async()
            .await;

        let running = CassidyClient::new(format!("{}/running", server.url()), None).unwrap();
        assert_eq!(
            running.fetch_profile("https://www.linkedin.com/in/a").await.unwrap(),
            WorkflowOutcome::Pending {
                run_id: "run_2".to_string()
            }
        );

        let failed = CassidyClient::new(format!("{}/failed", server.url()), None).unwrap();
        let err = failed
            .fetch_profile("https://www.linkedin.com/in/a")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::WorkflowFailed(msg) if msg == "captcha"));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/profile")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;
        let client = CassidyClient::new(format!("{}/profile", server.url()), None).unwrap();
        let err = client
            .fetch_company("https://www.linkedin.com/company/acme")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 503, .. }));
    }

    #[test]
    fn test_completed_without_output_is_parse_error() {
        let body = json!({"workflowRun": {"id": "r", "status": "COMPLETED", "actionResults": [{"output": "done"}]}});
        assert!(matches!(interpret_response(body), Err(ClientError::Parse(_))));
        let bare = json!({"name": "Acme"});
        assert_eq!(interpret_response(bare.clone()).unwrap(), WorkflowOutcome::Ready(bare));
    }
}
