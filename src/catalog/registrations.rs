//! Event registrations.

use std::collections::HashSet;

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Registered { registration_id: String },
    AlreadyRegistered,
}

/// Register `user_id` for `event_id`. Registering twice is not an error.
pub fn register_for_event(conn: &Connection, user_id: &str, event_id: &str) -> Result<RegistrationOutcome> {
    let is_active: Option<bool> = conn
        .query_row(
            "SELECT is_active FROM events WHERE id = ?1",
            params![event_id],
            |row| row.get(0),
        )
        .optional()?;
    match is_active {
        None => bail!("event not found: {event_id}"),
        Some(false) => bail!("event is not open for registration: {event_id}"),
        Some(true) => {}
    }

    let user_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![user_id],
        |row| row.get(0),
    )?;
    if !user_exists {
        bail!("user not found: {user_id}");
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO registrations (id, user_id, event_id, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, event_id, now],
    )?;

    if inserted == 0 {
        tracing::debug!(user_id, event_id, "already registered");
        return Ok(RegistrationOutcome::AlreadyRegistered);
    }

    tracing::info!(user_id, event_id, "registered for event");
    Ok(RegistrationOutcome::Registered { registration_id: id })
}

/// IDs of every event the user has registered for.
pub fn registered_event_ids(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT event_id FROM registrations WHERE user_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::events::{create_event, set_event_active};
    use crate::catalog::types::{NewEvent, NewUser, UserRole};
    use crate::catalog::users::create_user;
    use crate::db;

    fn setup(conn: &Connection) -> (String, String) {
        let user = create_user(
            conn,
            &NewUser {
                name: "Ada".into(),
                role: UserRole::Attendee,
                bio: None,
                interests: None,
            },
            None,
        )
        .unwrap();
        let event = create_event(
            conn,
            &NewEvent {
                title: "Jazz".into(),
                description: String::new(),
                location: String::new(),
                category: None,
                event_date: chrono::Utc::now(),
                organizer_id: None,
            },
            None,
        )
        .unwrap();
        (user.id, event.id)
    }

    #[test]
    fn register_then_duplicate() {
        let conn = db::open_memory_database().unwrap();
        let (user, event) = setup(&conn);

        let first = register_for_event(&conn, &user, &event).unwrap();
        assert!(matches!(first, RegistrationOutcome::Registered { .. }));

        let second = register_for_event(&conn, &user, &event).unwrap();
        assert_eq!(second, RegistrationOutcome::AlreadyRegistered);

        let ids = registered_event_ids(&conn, &user).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&event));
    }

    #[test]
    fn inactive_event_rejects_registration() {
        let conn = db::open_memory_database().unwrap();
        let (user, event) = setup(&conn);
        set_event_active(&conn, &event, false).unwrap();

        let err = register_for_event(&conn, &user, &event).unwrap_err();
        assert!(err.to_string().contains("not open"));
    }

    #[test]
    fn unknown_user_or_event_is_an_error() {
        let conn = db::open_memory_database().unwrap();
        let (user, event) = setup(&conn);
        assert!(register_for_event(&conn, "ghost", &event).is_err());
        assert!(register_for_event(&conn, &user, "ghost").is_err());
    }

    #[test]
    fn no_registrations_is_empty_set() {
        let conn = db::open_memory_database().unwrap();
        let (user, _) = setup(&conn);
        assert!(registered_event_ids(&conn, &user).unwrap().is_empty());
    }
}
