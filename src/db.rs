//! SQLite pool setup.
//!
//! Migrations are embedded with `include_str!` and applied on every open;
//! each statement is idempotent.

use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Embedded schema migrations, applied in order.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_scheduling",
        include_str!("../migrations/001_scheduling.sql"),
    ),
    (
        "002_candidates",
        include_str!("../migrations/002_candidates.sql"),
    ),
    (
        "003_knowledge",
        include_str!("../migrations/003_knowledge.sql"),
    ),
];

/// Open (or create) the database at `path` and apply migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
/// Callers treat this as fatal: there is no degraded mode without a store.
pub async fn open(path: &Path, max_connections: u32) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    migrate(&pool).await?;
    tracing::info!(path = %path.display(), "database ready");
    Ok(pool)
}

/// Open a private in-memory database with migrations applied.
///
/// In-memory databases are per-connection, so the pool holds one connection.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn open_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .pragma("foreign_keys", "ON");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to open in-memory database")?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Apply all embedded migrations.
///
/// # Errors
///
/// Returns an error naming the migration that failed.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    for (name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql)
            .execute(pool)
            .await
            .with_context(|| format!("failed to apply migration {name}"))?;
    }
    Ok(())
}
