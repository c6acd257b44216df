// src/core/service_client.rs
//! HTTP client for a deployed instance of this API, used by the operational tooling

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};

use crate::types::{HealthResponse, JobCreatedResponse, JobStatusResponse};
use crate::web::auth::API_KEY_HEADER;
use crate::web::API_BASE;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Response whose status the caller wants to inspect instead of failing on.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ServiceClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, API_BASE, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(endpoint));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    /// Returns `false` when the profile was already gone.
    pub async fn delete_profile(&self, profile_id: &str) -> Result<bool> {
        let url = format!("/profiles/{}", profile_id);
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .with_context(|| format!("Failed to DELETE {}", url))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                anyhow::bail!("HTTP {} error: {}", status, error_text)
            }
        }
    }

    pub async fn score(
        &self,
        profile_id: &str,
        template_id: Option<&str>,
        prompt: Option<&str>,
        enhanced: bool,
    ) -> Result<JobCreatedResponse> {
        let endpoint = if enhanced {
            format!("/profiles/{}/score-enhanced", profile_id)
        } else {
            format!("/profiles/{}/score", profile_id)
        };
        let mut payload = serde_json::Map::new();
        if let Some(template_id) = template_id {
            payload.insert("template_id".to_string(), json!(template_id));
        }
        if let Some(prompt) = prompt {
            payload.insert("prompt".to_string(), json!(prompt));
        }
        self.post_json(&endpoint, &Value::Object(payload)).await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobStatusResponse> {
        self.get(&format!("/scoring-jobs/{}", job_id)).await
    }

    /// POST without failing on non-2xx, for checks that expect an error status.
    pub async fn post_raw<T: Serialize + ?Sized>(&self, endpoint: &str, payload: &T) -> Result<RawResponse> {
        let response = self
            .request(Method::POST, endpoint)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", endpoint))?;
        let status = response.status();
        let text = response.text().await.context("Failed to read response body")?;
        trace!(endpoint, status = status.as_u16(), "Raw response received");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(RawResponse { status, body })
    }

    /// Generic POST request with JSON
    pub async fn post_json<T, R>(&self, endpoint: &str, payload: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(endpoint, "POST to service");
        let response = self
            .request(Method::POST, endpoint)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", self.url(endpoint)))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<R>()
                .await
                .context("Failed to parse JSON response")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("HTTP {} error: {}", status, error_text)
        }
    }

    /// Generic GET request
    pub async fn get<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, endpoint)
            .send()
            .await
            .with_context(|| format!("Failed to GET from {}", self.url(endpoint)))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<R>()
                .await
                .context("Failed to parse JSON response")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("HTTP {} error: {}", status, error_text)
        }
    }
}
