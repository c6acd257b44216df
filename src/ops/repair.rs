// src/ops/repair.rs
//! Timestamp repair: finds stored timestamps whose fractional seconds are not exactly six
//! digits, rewrites the ones that can be normalized and optionally deletes the rest.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::clients::supabase::eq;
use crate::clients::SupabaseClient;
use crate::timestamp::{has_six_digit_fraction, normalize_fraction};

const PAGE_SIZE: usize = 1000;

/// Row-level access the repair tool needs from a store.
#[async_trait]
pub trait RowAccess: Send + Sync {
    /// `(key, value)` for every row of `table`; `value` is `None` for SQL NULL.
    async fn fetch_column(&self, table: &str, key_column: &str, column: &str)
        -> Result<Vec<(String, Option<String>)>>;

    async fn patch_value(&self, table: &str, key_column: &str, key: &str, column: &str, value: &str)
        -> Result<()>;

    async fn delete_row(&self, table: &str, key_column: &str, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairTarget {
    pub table: String,
    pub key_column: String,
    pub columns: Vec<String>,
}

impl RepairTarget {
    pub fn new(table: &str, key_column: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Every timestamp column the service writes.
pub fn default_targets() -> Vec<RepairTarget> {
    vec![
        RepairTarget::new("profiles", "id", &["created_at", "updated_at"]),
        RepairTarget::new("companies", "id", &["created_at", "updated_at"]),
        RepairTarget::new("prompt_templates", "id", &["created_at", "updated_at"]),
        RepairTarget::new("scoring_jobs", "id", &["created_at", "started_at", "completed_at"]),
        RepairTarget::new("profile_embeddings", "profile_id", &["created_at"]),
    ]
}

/// Narrows the defaults to one table, or errors if the table is unknown.
pub fn targets_for(table: Option<&str>) -> Result<Vec<RepairTarget>> {
    let targets = default_targets();
    match table {
        None => Ok(targets),
        Some(name) => {
            let selected: Vec<_> = targets.into_iter().filter(|t| t.table == name).collect();
            if selected.is_empty() {
                anyhow::bail!("Unknown table '{}'", name);
            }
            Ok(selected)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub table: String,
    pub key_column: String,
    pub key: String,
    pub column: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unrepairable {
    pub table: String,
    pub key_column: String,
    pub key: String,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct RepairPlan {
    pub scanned: usize,
    pub fixes: Vec<Fix>,
    pub unrepairable: Vec<Unrepairable>,
}

#[derive(Debug, Default)]
pub struct RepairReport {
    pub scanned: usize,
    pub fixable: usize,
    pub unrepairable: usize,
    pub patched: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairOptions {
    pub check_only: bool,
    pub delete_unrepairable: bool,
}

pub async fn plan(access: &dyn RowAccess, targets: &[RepairTarget]) -> Result<RepairPlan> {
    let mut plan = RepairPlan::default();

    for target in targets {
        for column in &target.columns {
            let rows = access
                .fetch_column(&target.table, &target.key_column, column)
                .await
                .with_context(|| format!("Failed to read {}.{}", target.table, column))?;

            for (key, value) in rows {
                plan.scanned += 1;
                let Some(value) = value else { continue };
                if has_six_digit_fraction(&value) {
                    continue;
                }
                match normalize_fraction(&value) {
                    Some(to) => plan.fixes.push(Fix {
                        table: target.table.clone(),
                        key_column: target.key_column.clone(),
                        key,
                        column: column.clone(),
                        from: value,
                        to,
                    }),
                    None => plan.unrepairable.push(Unrepairable {
                        table: target.table.clone(),
                        key_column: target.key_column.clone(),
                        key,
                        column: column.clone(),
                        value,
                    }),
                }
            }
        }
    }

    Ok(plan)
}

pub async fn run(access: &dyn RowAccess, targets: &[RepairTarget], options: RepairOptions) -> Result<RepairReport> {
    let plan = plan(access, targets).await?;
    let mut report = RepairReport {
        scanned: plan.scanned,
        fixable: plan.fixes.len(),
        unrepairable: plan.unrepairable.len(),
        ..Default::default()
    };

    for fix in &plan.fixes {
        info!(table = %fix.table, key = %fix.key, column = %fix.column, from = %fix.from, to = %fix.to, "Fixable timestamp");
    }
    for bad in &plan.unrepairable {
        warn!(table = %bad.table, key = %bad.key, column = %bad.column, value = %bad.value, "Unrepairable timestamp");
    }

    if options.check_only {
        info!(scanned = report.scanned, fixable = report.fixable, unrepairable = report.unrepairable, "Check only, nothing written");
        return Ok(report);
    }

    for fix in &plan.fixes {
        access
            .patch_value(&fix.table, &fix.key_column, &fix.key, &fix.column, &fix.to)
            .await
            .with_context(|| format!("Failed to patch {}.{} for {}", fix.table, fix.column, fix.key))?;
        report.patched += 1;
    }

    if options.delete_unrepairable {
        let mut removed: Vec<(&str, &str)> = Vec::new();
        for bad in &plan.unrepairable {
            if removed.contains(&(bad.table.as_str(), bad.key.as_str())) {
                continue;
            }
            access
                .delete_row(&bad.table, &bad.key_column, &bad.key)
                .await
                .with_context(|| format!("Failed to delete {} row {}", bad.table, bad.key))?;
            removed.push((bad.table.as_str(), bad.key.as_str()));
            report.deleted += 1;
        }
    }

    info!(
        scanned = report.scanned,
        patched = report.patched,
        deleted = report.deleted,
        "Timestamp repair finished"
    );
    Ok(report)
}

fn cell_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RowAccess for SupabaseClient {
    async fn fetch_column(
        &self,
        table: &str,
        key_column: &str,
        column: &str,
    ) -> Result<Vec<(String, Option<String>)>> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = self
                .select(
                    table,
                    &[
                        ("select", format!("{},{}", key_column, column)),
                        ("order", format!("{}.asc", key_column)),
                        ("limit", PAGE_SIZE.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;
            let fetched = page.len();
            for row in page {
                let Some(key) = row.get(key_column).and_then(cell_to_string) else {
                    continue;
                };
                out.push((key, row.get(column).and_then(cell_to_string)));
            }
            if fetched < PAGE_SIZE {
                return Ok(out);
            }
            offset += fetched;
        }
    }

    async fn patch_value(&self, table: &str, key_column: &str, key: &str, column: &str, value: &str) -> Result<()> {
        self.update(table, &[(key_column, eq(key))], &json!({ column: value }))
            .await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, key_column: &str, key: &str) -> Result<()> {
        self.delete(table, &[(key_column, eq(key))]).await?;
        Ok(())
    }
}
