#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use eventmatch::catalog::types::{Event, NewEvent, NewUser, User, UserRole};
use eventmatch::catalog::{events, users};
use eventmatch::db;
use eventmatch::embedding::EmbeddingProvider;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Fixed "now" so event dates are deterministic.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
}

/// Unit vector in the plane at `cos` from the x axis.
pub fn at_similarity(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
}

/// Provider that answers from a fixed table, with a default for unknown text.
pub struct ScriptedProvider {
    dims: usize,
    vectors: HashMap<String, Vec<f32>>,
    default: Option<Vec<f32>>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vectors: HashMap::new(),
            default: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose every request fails, like an unreachable API.
    pub fn failing(dims: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dims)
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default = Some(vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("embeddings API unavailable");
        }
        match self.vectors.get(text).or(self.default.as_ref()) {
            Some(v) => Ok(v.clone()),
            None => bail!("no scripted vector for {text:?}"),
        }
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn attendee(conn: &Connection, interests: Option<&str>, embedding: Option<Vec<f32>>) -> User {
    users::create_user(
        conn,
        &NewUser {
            name: "Ada".into(),
            role: UserRole::Attendee,
            bio: None,
            interests: interests.map(str::to_string),
        },
        embedding.as_deref(),
    )
    .unwrap()
}

/// An active event `days_ahead` days after [`now`].
pub fn event(
    conn: &Connection,
    title: &str,
    category: Option<&str>,
    days_ahead: i64,
    embedding: Option<Vec<f32>>,
) -> Event {
    events::create_event(
        conn,
        &NewEvent {
            title: title.into(),
            description: format!("{title} description"),
            location: "Springfield".into(),
            category: category.map(str::to_string),
            event_date: now() + Duration::days(days_ahead),
            organizer_id: None,
        },
        embedding.as_deref(),
    )
    .unwrap()
}
