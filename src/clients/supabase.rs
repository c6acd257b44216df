// src/clients/supabase.rs
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ensure_success, ClientError, ClientResult};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Thin PostgREST client for a Supabase project.
///
/// Filters use PostgREST syntax, e.g. `("id", "eq.123")` or `("order", "created_at.desc")`.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, service_key: String) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn headers(&self) -> ClientResult<HeaderMap> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            ClientError::Parse(format!("invalid Supabase key header: {}", e))
        };
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.service_key).map_err(invalid)?);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.service_key)).map_err(invalid)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn request(&self, method: Method, table: &str, filters: &[(&str, String)]) -> ClientResult<reqwest::RequestBuilder> {
        Ok(self
            .http
            .request(method, self.table_url(table))
            .headers(self.headers()?)
            .query(filters))
    }

    pub async fn select(&self, table: &str, filters: &[(&str, String)]) -> ClientResult<Vec<Value>> {
        debug!(table, ?filters, "Supabase select");
        let resp = self.request(Method::GET, table, filters)?.send().await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    pub async fn select_one(&self, table: &str, filters: &[(&str, String)]) -> ClientResult<Option<Value>> {
        let mut filters = filters.to_vec();
        filters.push(("limit", "1".to_string()));
        Ok(self.select(table, &filters).await?.into_iter().next())
    }

    pub async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> ClientResult<Vec<Value>> {
        debug!(table, "Supabase insert");
        let resp = self
            .request(Method::POST, table, &[])?
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    pub async fn update<T: Serialize + ?Sized>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        patch: &T,
    ) -> ClientResult<Vec<Value>> {
        debug!(table, ?filters, "Supabase update");
        let resp = self
            .request(Method::PATCH, table, filters)?
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    /// Inserts or merges on the given conflict column.
    pub async fn upsert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> ClientResult<Vec<Value>> {
        debug!(table, on_conflict, "Supabase upsert");
        let resp = self
            .request(Method::POST, table, &[("on_conflict", on_conflict.to_string())])?
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(row)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    /// Deletes matching rows and returns how many went away.
    pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> ClientResult<usize> {
        debug!(table, ?filters, "Supabase delete");
        let resp = self
            .request(Method::DELETE, table, filters)?
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let removed: Vec<Value> = ensure_success(resp).await?.json().await?;
        Ok(removed.len())
    }

    /// Inserts unless a row with the same `on_conflict` value exists. Returns the
    /// inserted rows, which are empty when the row was skipped.
    pub async fn insert_if_absent<T: Serialize + ?Sized>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> ClientResult<Vec<Value>> {
        debug!(table, on_conflict, "Supabase insert if absent");
        let resp = self
            .request(Method::POST, table, &[("on_conflict", on_conflict.to_string())])?
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .json(row)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    /// Cheap reachability check used by the health endpoint.
    pub async fn ping(&self, table: &str) -> ClientResult<()> {
        self.select(table, &[("select", "id".to_string()), ("limit", "1".to_string())])
            .await
            .map(|_| ())
    }
}

pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn client(server: &mockito::ServerGuard) -> SupabaseClient {
        SupabaseClient::new(&server.url(), "service-key".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_select_sends_auth_and_filters() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/rest/v1/profiles")
            .match_header("apikey", "service-key")
            .match_header("authorization", "Bearer service-key")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.p1".into()))
            .with_status(200)
            .with_body(r#"[{"id": "p1", "full_name": "Jane"}]"#)
            .expect(1)
            .create_async()
            .await;

        let rows = client(&server)
            .await
            .select("profiles", &[("id", eq("p1"))])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["full_name"], "Jane");
    }

    #[tokio::test]
    async fn test_insert_requests_representation() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/rest/v1/prompt_templates")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::PartialJson(json!({"name": "Engineer"})))
            .with_status(201)
            .with_body(r#"[{"id": "t1", "name": "Engineer"}]"#)
            .create_async()
            .await;

        let rows = client(&server)
            .await
            .insert("prompt_templates", &json!({"name": "Engineer"}))
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], "t1");
    }

    #[tokio::test]
    async fn test_delete_counts_rows_and_errors_surface() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("DELETE", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.p1".into()))
            .with_status(200)
            .with_body(r#"[{"id": "p1"}]"#)
            .create_async()
            .await;
        let _err = server
            .mock("PATCH", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message": "invalid input syntax for type timestamp"}"#)
            .create_async()
            .await;

        let supabase = client(&server).await;
        assert_eq!(supabase.delete("profiles", &[("id", eq("p1"))]).await.unwrap(), 1);
        let err = supabase
            .update("profiles", &[("id", eq("p1"))], &json!({"created_at": "bad"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_insert_if_absent_skips_duplicates() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("on_conflict".into(), "linkedin_url".into()))
            .match_header("prefer", "return=representation,resolution=ignore-duplicates")
            .with_status(201)
            .with_body("[]")
            .create_async()
            .await;

        let rows = client(&server)
            .await
            .insert_if_absent(
                "profiles",
                "linkedin_url",
                &json!({"linkedin_url": "https://www.linkedin.com/in/jane"}),
            )
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
