//! Record types for the event catalog.
//!
//! Defines [`UserRole`], [`User`] (a profile with an optional embedding),
//! [`Event`] (an event listing with an optional category label and embedding),
//! and the input structs used to create or change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Organizers may also browse as attendees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Organizer,
    Attendee,
}

impl UserRole {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Attendee => "attendee",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organizer" => Ok(Self::Organizer),
            "attendee" => Ok(Self::Attendee),
            _ => Err(format!("unknown user role: {s}")),
        }
    }
}

/// A user profile, matching the `users` table.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// UUID v7 primary key.
    pub id: String,
    pub name: String,
    pub role: UserRole,
    pub bio: Option<String>,
    /// Free-text interests, e.g. `"hiking, nature, jazz"`.
    pub interests: Option<String>,
    /// Embedding of bio + interests; `None` if never computed or the provider failed.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: String,
    pub updated_at: String,
}

/// An event listing, matching the `events` table.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// UUID v7 primary key.
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    /// Short tag such as `"Outdoors & Adventure"`, used for keyword matching.
    pub category: Option<String>,
    /// RFC 3339 UTC timestamp, second precision.
    pub event_date: String,
    pub organizer_id: Option<String>,
    pub is_active: bool,
    /// Embedding of title + description + location.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub interests: Option<String>,
}

/// Input for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub event_date: DateTime<Utc>,
    pub organizer_id: Option<String>,
}

/// Partial update of an event; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl EventUpdate {
    /// The event as it will look once this update is applied.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut updated = event.clone();
        if let Some(ref title) = self.title {
            updated.title = title.clone();
        }
        if let Some(ref description) = self.description {
            updated.description = description.clone();
        }
        if let Some(ref location) = self.location {
            updated.location = location.clone();
        }
        if let Some(ref category) = self.category {
            updated.category = Some(category.clone());
        }
        if let Some(date) = self.event_date {
            updated.event_date = format_timestamp(date);
        }
        if let Some(active) = self.is_active {
            updated.is_active = active;
        }
        updated
    }

    /// Whether the update touches any field that feeds the event's embedding.
    pub fn changes_text(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.location.is_some()
    }
}

/// Canonical timestamp format for stored dates; sorts lexicographically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
