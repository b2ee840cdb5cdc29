//! Event listing storage.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use super::profile::event_profile_text;
use super::types::{format_timestamp, Event, EventUpdate, NewEvent};
use super::{read_embedding, write_embedding};

const EVENT_COLUMNS: &str = "id, title, description, location, category, event_date, \
                             organizer_id, is_active, embedding, created_at, updated_at";

/// Insert a new active event with its (possibly absent) embedding.
pub fn create_event(conn: &Connection, event: &NewEvent, embedding: Option<&[f32]>) -> Result<Event> {
    if event.title.trim().is_empty() {
        bail!("event title must not be empty");
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO events (id, title, description, location, category, event_date, \
         organizer_id, is_active, embedding, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
        params![
            id,
            event.title,
            event.description,
            event.location,
            normalize_category(event.category.as_deref()),
            format_timestamp(event.event_date),
            event.organizer_id,
            write_embedding(embedding),
            now,
        ],
    )?;

    tracing::info!(
        event_id = %id,
        category = event.category.as_deref().unwrap_or(""),
        has_embedding = embedding.is_some(),
        "event created"
    );

    get_event(conn, &id)
}

/// The row changed between reading it and writing an update derived from it.
#[derive(Debug, Error)]
#[error("event {event_id} was modified concurrently; retry the update")]
pub struct EventChanged {
    pub event_id: String,
}

/// Apply `update` to an event.
///
/// When the update touches title, description or location, `embed` is called
/// with the new profile text and its result replaces the stored vector (absent
/// if it returns `None`). Updates that only move the date, category or active
/// flag keep the existing vector and never call `embed`.
///
/// Every field is written in one guarded statement that only matches the row
/// as it was read. If another writer got there first the call fails with
/// [`EventChanged`] and nothing is written.
pub fn update_event(
    conn: &Connection,
    event_id: &str,
    update: &EventUpdate,
    embed: impl FnOnce(&str) -> Option<Vec<f32>>,
) -> Result<Event> {
    let existing = get_event(conn, event_id)?;
    let updated = update.apply_to(&existing);
    if updated.title.trim().is_empty() {
        bail!("event title must not be empty");
    }

    let reembed = update.changes_text();
    let embedding = if reembed {
        event_profile_text(&updated.title, &updated.description, &updated.location)
            .and_then(|text| embed(&text))
    } else {
        None
    };
    let now = chrono::Utc::now().to_rfc3339();

    let rows = conn.execute(
        "UPDATE events SET title = ?1, description = ?2, location = ?3, category = ?4, \
         event_date = ?5, is_active = ?6, \
         embedding = CASE WHEN ?7 THEN ?8 ELSE embedding END, updated_at = ?9 \
         WHERE id = ?10 AND updated_at = ?11 \
         AND title = ?12 AND description = ?13 AND location = ?14",
        params![
            updated.title,
            updated.description,
            updated.location,
            normalize_category(updated.category.as_deref()),
            updated.event_date,
            updated.is_active,
            reembed,
            write_embedding(embedding.as_deref()),
            now,
            event_id,
            existing.updated_at,
            existing.title,
            existing.description,
            existing.location,
        ],
    )?;
    if rows == 0 {
        // Distinguish a deleted row from a concurrent edit.
        get_event(conn, event_id)?;
        tracing::warn!(event_id, "event changed while updating, nothing written");
        return Err(EventChanged {
            event_id: event_id.to_string(),
        }
        .into());
    }

    tracing::info!(
        event_id,
        reembedded = reembed,
        has_embedding = embedding.is_some(),
        "event updated"
    );

    get_event(conn, event_id)
}

/// Activate or deactivate an event; inactive events are never recommended.
pub fn set_event_active(conn: &Connection, event_id: &str, active: bool) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE events SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active, now, event_id],
    )?;
    if rows == 0 {
        bail!("event not found: {event_id}");
    }
    Ok(())
}

/// Store a re-computed vector for `event`, provided its title, description and
/// location still match what the vector was built from. Returns whether the
/// row was written; `false` means the text changed meanwhile and the vector was
/// dropped.
pub fn replace_event_embedding(
    conn: &Connection,
    event: &Event,
    embedding: Option<&[f32]>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE events SET embedding = ?1 \
         WHERE id = ?2 AND title = ?3 AND description = ?4 AND location = ?5",
        params![
            write_embedding(embedding),
            event.id,
            event.title,
            event.description,
            event.location,
        ],
    )?;
    if rows == 0 {
        get_event(conn, &event.id)?;
        tracing::warn!(event_id = %event.id, "event text changed during re-embed, vector dropped");
    }
    Ok(rows > 0)
}

/// Fetch an event by ID.
pub fn get_event(conn: &Connection, event_id: &str) -> Result<Event> {
    let event = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
            params![event_id],
            event_from_row,
        )
        .optional()?;

    match event {
        Some(event) => Ok(event),
        None => bail!("event not found: {event_id}"),
    }
}

/// Active events on or after `now`, soonest first.
pub fn upcoming_events(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events \
         WHERE is_active = 1 AND event_date >= ?1 \
         ORDER BY event_date, id"
    ))?;
    let events = stmt
        .query_map(params![format_timestamp(now)], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// All events regardless of state, oldest first.
pub fn all_events(conn: &Connection) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at, id"
    ))?;
    let events = stmt
        .query_map([], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

fn normalize_category(category: Option<&str>) -> Option<&str> {
    category.map(str::trim).filter(|c| !c.is_empty())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let id: String = row.get(0)?;
    let embedding = read_embedding("events", &id, row.get(8)?);

    Ok(Event {
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        category: row.get(4)?,
        event_date: row.get(5)?,
        organizer_id: row.get(6)?,
        is_active: row.get(7)?,
        embedding,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        id,
    })
}
