//! Database initialization
//!
//! Opens the SQLite index, creates the QC tables and seeds the global rating
//! enumeration. Table creation is idempotent; `initialize_index` additionally
//! refuses to run twice against the same database.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Tables that make up an initialized index
pub const QC_TABLES: [&str; 8] = [
    "schema_version",
    "components",
    "annotations",
    "ratings",
    "table_rows",
    "table_columns",
    "entities",
    "images",
];

/// Ratings seeded when the QC specification does not list its own
pub const DEFAULT_RATINGS: [&str; 3] = ["Pass", "Fail", "Uncertain"];

/// Open (or create) the SQLite index at `db_path`
///
/// Foreign keys are enforced on every pooled connection; WAL mode lets readers
/// proceed while a reconciliation transaction is open.
pub async fn open_database(db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Created new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Open a private in-memory index (single connection so every query sees the same data)
pub async fn open_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // Closing the only connection would drop the whole database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Check whether every QC table exists
pub async fn is_initialized(pool: &SqlitePool) -> Result<bool> {
    let mut present = 0usize;
    for table in QC_TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;
        if exists {
            present += 1;
        }
    }

    Ok(present == QC_TABLES.len())
}

/// Create the QC tables and seed `ratings`
///
/// Fails with [`Error::AlreadyInitialized`] when the tables already exist so a
/// second `initialize` cannot silently mix two index runs.
pub async fn initialize_index(pool: &SqlitePool, db_label: &Path, ratings: &[String]) -> Result<()> {
    if is_initialized(pool).await? {
        return Err(Error::AlreadyInitialized(db_label.to_path_buf()));
    }

    let mut tx = pool.begin().await?;
    create_tables(&mut tx).await?;
    seed_ratings(&mut tx, ratings).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(CURRENT_SCHEMA_VERSION)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        "Initialized QC index schema v{} with {} ratings",
        CURRENT_SCHEMA_VERSION,
        ratings.len()
    );
    Ok(())
}

/// Ensure the database holds an initialized index
pub async fn require_initialized(pool: &SqlitePool, db_label: &Path) -> Result<()> {
    if is_initialized(pool).await? {
        Ok(())
    } else {
        Err(Error::NotInitialized(db_label.to_path_buf()))
    }
}

/// Create all QC tables (idempotent)
pub async fn create_tables(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            component_id INTEGER NOT NULL REFERENCES components(id),
            UNIQUE (name, component_id)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ratings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS table_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS table_columns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    // (row_id, column_id) is the cell identity: at most one entity per cell
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            component_id INTEGER NOT NULL REFERENCES components(id),
            row_id INTEGER NOT NULL REFERENCES table_rows(id),
            column_id INTEGER NOT NULL REFERENCES table_columns(id),
            comment TEXT NOT NULL DEFAULT '',
            rating_id INTEGER REFERENCES ratings(id),
            annotation_id INTEGER REFERENCES annotations(id),
            UNIQUE (row_id, column_id)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_entity ON images(entity_id, position)")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Insert every rating name not already present
pub async fn seed_ratings(conn: &mut SqliteConnection, ratings: &[String]) -> Result<()> {
    for rating in ratings {
        sqlx::query("INSERT INTO ratings (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(rating)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Default rating names as owned strings
pub fn default_ratings() -> Vec<String> {
    DEFAULT_RATINGS.iter().map(|r| r.to_string()).collect()
}
