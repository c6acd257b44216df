// src/ops/migrate.rs
//! Applies `migrations/*.sql` to Postgres in file-name order, recording each in
//! `schema_migrations`. Every file runs in its own transaction.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tracing::info;

const CREATE_TRACKING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    TEXT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub version: String,
    pub path: PathBuf,
    pub sql: String,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub already_applied: Vec<String>,
    pub pending: Vec<String>,
    pub applied: Vec<String>,
}

/// Reads every `.sql` file in `dir`, sorted by file name. The version is the file stem.
pub fn load_migrations(dir: &Path) -> Result<Vec<Migration>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read migrations directory: {}", dir.display()))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(version) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };
        let sql = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read migration {}", path.display()))?;
        migrations.push(Migration { version, path, sql });
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(migrations)
}

pub fn pending<'a>(migrations: &'a [Migration], applied: &[String]) -> Vec<&'a Migration> {
    migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect()
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<String>> {
    let table: Option<String> = sqlx::query_scalar("SELECT to_regclass('schema_migrations')::text")
        .fetch_one(pool)
        .await
        .context("Failed to look up schema_migrations")?;
    if table.is_none() {
        return Ok(Vec::new());
    }
    sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")
}

pub async fn run(database_url: &str, dir: &Path, check_only: bool) -> Result<MigrationReport> {
    let migrations = load_migrations(dir)?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    let already_applied = applied_versions(&pool).await?;
    let todo = pending(&migrations, &already_applied);
    let mut report = MigrationReport {
        pending: todo.iter().map(|m| m.version.clone()).collect(),
        already_applied,
        ..Default::default()
    };
    info!(
        applied = report.already_applied.len(),
        pending = report.pending.len(),
        "Migration status"
    );

    if check_only || todo.is_empty() {
        pool.close().await;
        return Ok(report);
    }

    sqlx::raw_sql(CREATE_TRACKING_TABLE)
        .execute(&pool)
        .await
        .context("Failed to create schema_migrations")?;

    for migration in todo {
        info!(version = %migration.version, path = %migration.path.display(), "Applying migration");
        let mut tx = pool.begin().await.context("Failed to open transaction")?;
        sqlx::raw_sql(&migration.sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration {} failed", migration.version))?;
        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(&migration.version)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to record migration {}", migration.version))?;
        tx.commit().await.context("Failed to commit migration")?;
        report.applied.push(migration.version.clone());
    }

    pool.close().await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_migrations_sorted_sql_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0002_add_index.sql"), "CREATE INDEX x ON t (a);").unwrap();
        std::fs::write(dir.path().join("0001_init.sql"), "CREATE TABLE t (a INT);").unwrap();
        std::fs::write(dir.path().join("README.md"), "notes").unwrap();

        let migrations = load_migrations(dir.path()).unwrap();
        let versions: Vec<_> = migrations.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["0001_init", "0002_add_index"]);
        assert!(migrations[0].sql.contains("CREATE TABLE"));
    }

    #[test]
    fn test_pending_skips_applied() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0001_init.sql", "0002_more.sql", "0003_last.sql"] {
            std::fs::write(dir.path().join(name), "SELECT 1;").unwrap();
        }
        let migrations = load_migrations(dir.path()).unwrap();
        let todo = pending(&migrations, &["0001_init".to_string(), "0003_last".to_string()]);
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].version, "0002_more");
    }

    #[test]
    fn test_missing_directory_errors() {
        assert!(load_migrations(Path::new("/nonexistent/migrations")).is_err());
    }

    #[test]
    fn test_shipped_schema_present() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let migrations = load_migrations(&dir).unwrap();
        assert_eq!(migrations[0].version, "0001_init");
        for table in ["profiles", "companies", "prompt_templates", "scoring_jobs", "profile_embeddings"] {
            assert!(migrations[0].sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} ", table)));
        }
    }

    #[test]
    fn test_shipped_timestamps_are_text() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let sql = &load_migrations(&dir).unwrap()[0].sql;
        for line in sql.lines().map(str::trim) {
            let column = line.split_whitespace().next().unwrap_or_default();
            if column.ends_with("_at") {
                assert!(
                    matches!(line.split_whitespace().nth(1), Some("TEXT" | "TEXT,")),
                    "{} is not TEXT",
                    line
                );
            }
        }
        assert!(!sql.contains("TIMESTAMPTZ"));
    }
}
