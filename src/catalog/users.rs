//! User profile storage.
//!
//! Every write that changes a profile's text also replaces its embedding in the
//! same statement, so a stored vector always describes the current text.

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{NewUser, User, UserRole};
use super::{read_embedding, write_embedding};

const USER_COLUMNS: &str = "id, name, role, bio, interests, embedding, created_at, updated_at";

/// Insert a new user with its (possibly absent) profile embedding.
pub fn create_user(conn: &Connection, user: &NewUser, embedding: Option<&[f32]>) -> Result<User> {
    if user.name.trim().is_empty() {
        bail!("user name must not be empty");
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, name, role, bio, interests, embedding, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            id,
            user.name,
            user.role.as_str(),
            user.bio,
            user.interests,
            write_embedding(embedding),
            now,
        ],
    )?;

    tracing::info!(
        user_id = %id,
        role = %user.role,
        has_embedding = embedding.is_some(),
        "user created"
    );

    get_user(conn, &id)
}

/// Replace a user's bio and interests together with the embedding derived from them.
pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    bio: Option<&str>,
    interests: Option<&str>,
    embedding: Option<&[f32]>,
) -> Result<User> {
    let now = chrono::Utc::now().to_rfc3339();
    let rows = conn.execute(
        "UPDATE users SET bio = ?1, interests = ?2, embedding = ?3, updated_at = ?4 WHERE id = ?5",
        params![bio, interests, write_embedding(embedding), now, user_id],
    )?;
    if rows == 0 {
        bail!("user not found: {user_id}");
    }

    tracing::info!(user_id, has_embedding = embedding.is_some(), "profile updated");
    get_user(conn, user_id)
}

/// Store a re-computed vector for `user`, provided bio and interests still
/// match what the vector was built from. Returns whether the row was written.
pub fn replace_user_embedding(conn: &Connection, user: &User, embedding: Option<&[f32]>) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE users SET embedding = ?1 WHERE id = ?2 AND bio IS ?3 AND interests IS ?4",
        params![write_embedding(embedding), user.id, user.bio, user.interests],
    )?;
    if rows == 0 {
        get_user(conn, &user.id)?;
        tracing::warn!(user_id = %user.id, "profile changed during re-embed, vector dropped");
    }
    Ok(rows > 0)
}

/// Fetch a user by ID.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<User> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .optional()?;

    match user {
        Some(user) => Ok(user),
        None => bail!("user not found: {user_id}"),
    }
}

/// All users, oldest first.
pub fn all_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
    ))?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(2)?;
    let role = role.parse::<UserRole>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;
    let embedding = read_embedding("users", &id, row.get(5)?);

    Ok(User {
        name: row.get(1)?,
        role,
        bio: row.get(3)?,
        interests: row.get(4)?,
        embedding,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        id,
    })
}
