// src/ops/cleanup.rs
//! Bulk profile deletion against a deployed instance.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::core::ServiceClient;

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub missing: Vec<String>,
    pub errors: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reads profile ids from the first column of a CSV file. A header row named `id` or
/// `profile_id` is skipped, as are blank cells and duplicates.
pub fn read_ids_csv(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    parse_ids_csv(&content)
}

fn parse_ids_csv(content: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut ids: Vec<String> = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV record at line {}", index + 1))?;
        let id = record.get(0).unwrap_or("").trim();
        if id.is_empty() || (index == 0 && matches!(id, "id" | "profile_id")) {
            continue;
        }
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Deletes each profile. By default failures are collected and the run continues;
/// with `strict` the first failure aborts.
pub async fn delete_profiles(client: &ServiceClient, ids: &[String], strict: bool) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for id in ids {
        match client.delete_profile(id).await {
            Ok(true) => {
                info!(profile_id = %id, "Deleted profile");
                report.deleted.push(id.clone());
            }
            Ok(false) => {
                info!(profile_id = %id, "Profile already absent");
                report.missing.push(id.clone());
            }
            Err(e) if strict => {
                return Err(e.context(format!("Failed to delete profile {}", id)));
            }
            Err(e) => {
                warn!(profile_id = %id, error = %e, "Failed to delete profile, continuing");
                report.errors.push((id.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write;

    #[test]
    fn test_parse_ids_skips_header_blanks_and_duplicates() {
        let ids = parse_ids_csv("profile_id,name\np1,Jane\n,\np2\np1,again\n").unwrap();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_read_ids_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a1").unwrap();
        writeln!(file, "b2").unwrap();
        assert_eq!(read_ids_csv(file.path()).unwrap(), vec!["a1", "b2"]);
        assert!(read_ids_csv(Path::new("/nonexistent/ids.csv")).is_err());
    }

    async fn server_with_outcomes() -> mockito::ServerGuard {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/profiles/ok")
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/v1/profiles/gone")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/v1/profiles/bad")
            .with_status(500)
            .with_body("db down")
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_lenient_run_collects_errors() {
        let server = server_with_outcomes().await;
        let client = ServiceClient::new(&server.url(), Some("k".into())).unwrap();
        let ids: Vec<String> = ["bad", "ok", "gone"].iter().map(|s| s.to_string()).collect();

        let report = delete_profiles(&client, &ids, false).await.unwrap();
        assert_eq!(report.deleted, vec!["ok"]);
        assert_eq!(report.missing, vec!["gone"]);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_strict_run_stops_at_first_error() {
        let server = server_with_outcomes().await;
        let client = ServiceClient::new(&server.url(), Some("k".into())).unwrap();
        let ids: Vec<String> = ["bad", "ok"].iter().map(|s| s.to_string()).collect();

        let err = delete_profiles(&client, &ids, true).await.unwrap_err();
        assert!(err.to_string().contains("bad"));
    }
}
