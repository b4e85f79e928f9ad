//! Database initialization
//!
//! Opens (or creates) the SQLite store and applies the schema script.
//! The script is executed statement by statement and only contains
//! `CREATE ... IF NOT EXISTS` statements, so it runs on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// DDL applied at startup
pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the schema applied
///
/// Limited to a single connection that is never recycled: every
/// connection to `sqlite::memory:` is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Execute the schema script one statement at a time
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let statements = schema_statements(SCHEMA_SQL);

    for stmt in &statements {
        debug!("Applying schema statement: {}", stmt.lines().next().unwrap_or_default());
        sqlx::query(stmt).execute(pool).await?;
    }

    info!("Database schema applied ({} statements)", statements.len());

    Ok(())
}

/// Split a DDL script into executable statements
///
/// `--` comment lines are dropped; statements are separated by `;`.
pub fn schema_statements(ddl: &str) -> Vec<String> {
    let without_comments: String = ddl
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_split() {
        let ddl = "-- header\nCREATE TABLE a (id INTEGER);\n\n-- note\nCREATE TABLE b (id INTEGER);\n";
        let stmts = schema_statements(ddl);
        assert_eq!(
            stmts,
            vec!["CREATE TABLE a (id INTEGER)", "CREATE TABLE b (id INTEGER)"]
        );
    }

    #[test]
    fn test_bundled_schema_is_idempotent_ddl() {
        let stmts = schema_statements(SCHEMA_SQL);
        assert!(!stmts.is_empty());
        for stmt in stmts {
            assert!(
                stmt.contains("IF NOT EXISTS"),
                "statement is not idempotent: {}",
                stmt
            );
        }
    }

    #[tokio::test]
    async fn test_memory_database_has_tables() {
        let pool = init_memory_database().await.expect("memory database");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["albums", "artists", "plays", "tracks", "users"]);
    }
}
