//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Model assumed for vectors written before the model was recorded.
const LEGACY_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        let tx = conn.unchecked_transaction()?;
        match next {
            2 => migrate_v1_to_v2(&tx)?,
            3 => migrate_v2_to_v3(&tx)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }
        update_schema_version(&tx, next)?;
        tx.commit()?;

        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: Store embedding model identifier in schema_meta.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [LEGACY_EMBEDDING_MODEL],
    )?;
    Ok(())
}

/// Migration v2 → v3: Normalize legacy "no vector" encodings to NULL.
///
/// Early rows stored an empty string or `[]` when embedding generation failed.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    for table in ["users", "events"] {
        let updated = conn.execute(
            &format!(
                "UPDATE {table} SET embedding = NULL \
                 WHERE TRIM(embedding) IN ('', 'null', '[]')"
            ),
            [],
        )?;
        if updated > 0 {
            tracing::info!(table, rows = updated, "cleared legacy empty embeddings");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn get_schema_version_returns_1_on_fresh_db() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn run_migrations_upgrades_to_current() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migration_v1_to_v2_adds_embedding_model() {
        let conn = test_db();
        assert!(get_embedding_model(&conn).unwrap().is_none());

        run_migrations(&conn).unwrap();

        let model = get_embedding_model(&conn).unwrap();
        assert_eq!(model, Some("text-embedding-3-small".to_string()));
    }

    #[test]
    fn migration_v2_to_v3_clears_legacy_embeddings() {
        let conn = test_db();
        conn.execute_batch(
            "INSERT INTO users (id, name, role, embedding, created_at, updated_at)
                 VALUES ('u1', 'Ada', 'attendee', '', 't', 't');
             INSERT INTO users (id, name, role, embedding, created_at, updated_at)
                 VALUES ('u2', 'Bo', 'attendee', '[0.5,0.5]', 't', 't');
             INSERT INTO events (id, title, event_date, embedding, created_at, updated_at)
                 VALUES ('e1', 'Jazz', '2030-01-01T00:00:00Z', ' [] ', 't', 't');",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let u1: Option<String> = conn
            .query_row("SELECT embedding FROM users WHERE id = 'u1'", [], |r| r.get(0))
            .unwrap();
        let u2: Option<String> = conn
            .query_row("SELECT embedding FROM users WHERE id = 'u2'", [], |r| r.get(0))
            .unwrap();
        let e1: Option<String> = conn
            .query_row("SELECT embedding FROM events WHERE id = 'e1'", [], |r| r.get(0))
            .unwrap();
        assert!(u1.is_none());
        assert_eq!(u2.as_deref(), Some("[0.5,0.5]"));
        assert!(e1.is_none());
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap(); // second call should not error
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn set_and_get_embedding_model() {
        let conn = test_db();
        run_migrations(&conn).unwrap();

        set_embedding_model(&conn, "text-embedding-3-large").unwrap();
        assert_eq!(
            get_embedding_model(&conn).unwrap(),
            Some("text-embedding-3-large".to_string())
        );
    }
}
