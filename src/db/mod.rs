pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::recommend::codec;

/// Open (or create) the eventmatch database at the given path with the schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub embedding_model: Option<String>,
    pub user_count: u64,
    pub event_count: u64,
    pub registration_count: u64,
    /// Users and events without a usable embedding: absent or unreadable.
    pub missing_embeddings: u64,
    /// The unreadable subset of `missing_embeddings` (corrupt stored text).
    pub corrupt_embeddings: u64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Gather schema, row-count, and integrity information.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let embedding_model = migrations::get_embedding_model(conn)?;

    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    let user_count = count("SELECT COUNT(*) FROM users")?;
    let event_count = count("SELECT COUNT(*) FROM events")?;
    let registration_count = count("SELECT COUNT(*) FROM registrations")?;
    let (missing_embeddings, corrupt_embeddings) = count_unusable_embeddings(conn)?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let integrity_ok = integrity_details == "ok";

    Ok(HealthReport {
        schema_version,
        embedding_model,
        user_count,
        event_count,
        registration_count,
        missing_embeddings,
        corrupt_embeddings,
        integrity_ok,
        integrity_details,
    })
}

/// Decode every stored vector the way the catalog does and count the ones a
/// ranking pass would skip. Returns `(unusable, corrupt)`.
fn count_unusable_embeddings(conn: &Connection) -> Result<(u64, u64)> {
    let mut stmt = conn.prepare("SELECT embedding FROM users UNION ALL SELECT embedding FROM events")?;
    let mut rows = stmt.query([])?;

    let (mut unusable, mut corrupt) = (0u64, 0u64);
    while let Some(row) = rows.next()? {
        let stored: Option<String> = row.get(0)?;
        match codec::decode_column(stored.as_deref()) {
            Ok(Some(_)) => {}
            Ok(None) => unusable += 1,
            Err(_) => {
                unusable += 1;
                corrupt += 1;
            }
        }
    }
    Ok((unusable, corrupt))
}
