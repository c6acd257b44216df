// src/clients/llm.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ensure_success, ClientError, ClientResult, CompletionRequest, LlmBackend};
use crate::utils::join_url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Chat completions and embeddings against any OpenAI-compatible endpoint.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_embedding_model(mut self, model: &str) -> Self {
        self.embedding_model = model.to_string();
        self
    }

    fn headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ClientError::Parse(format!("invalid API key header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatClient {
    fn default_model(&self) -> &str {
        &self.model
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ClientResult<String> {
        let url = join_url(&self.base_url, "chat/completions");
        let model = request.model.as_deref().unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(model, "LLM chat request");
        let resp = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let chat: ChatResponse = ensure_success(resp).await?.json().await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClientError::Parse("no completion in LLM response".to_string()))
    }

    async fn embed(&self, text: &str) -> ClientResult<Vec<f32>> {
        let url = join_url(&self.base_url, "embeddings");
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        debug!(model = %self.embedding_model, chars = text.len(), "LLM embedding request");
        let resp = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let embedded: EmbeddingResponse = ensure_success(resp).await?.json().await?;

        embedded
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ClientError::Parse("no embedding in LLM response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_sends_system_and_model() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "custom-model",
                "messages": [
                    {"role": "system", "content": "be strict"},
                    {"role": "user", "content": "score this"}
                ],
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "{\"score\": 90}"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiCompatClient::new("sk-test".to_string())
            .unwrap()
            .with_base_url(&format!("{}/v1/", server.url()));
        let mut request = CompletionRequest::new("score this")
            .with_system("be strict")
            .with_model(Some("custom-model".to_string()));
        request.json_mode = true;

        let text = client.complete(&request).await.unwrap();
        assert_eq!(text, r#"{"score": 90}"#);
    }

    #[tokio::test]
    async fn test_complete_error_and_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;
        let client = OpenAiCompatClient::new("k".to_string())
            .unwrap()
            .with_base_url(&server.url());
        let err = client.complete(&CompletionRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 429, ref message } if message == "rate limited"));

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;
        let client = OpenAiCompatClient::new("k".to_string())
            .unwrap()
            .with_base_url(&server.url());
        assert!(matches!(
            client.complete(&CompletionRequest::new("x")).await,
            Err(ClientError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_embed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(json!({"model": "embed-small"})))
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [0.5, -0.25, 1.0]}]}"#)
            .create_async()
            .await;
        let client = OpenAiCompatClient::new("k".to_string())
            .unwrap()
            .with_base_url(&server.url())
            .with_embedding_model("embed-small");
        assert_eq!(client.embed("hello").await.unwrap(), vec![0.5, -0.25, 1.0]);
    }
}
