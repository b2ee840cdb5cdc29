//! Per-user event recommendations.
//!
//! [`recommend_for_user`] gathers everything a ranking pass needs for one user
//! (query vector, interest keywords, and the upcoming events they have not yet
//! registered for), then hands it to [`rank`] and shapes the result for display.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::rank::{rank, Candidate, RankPolicy, ScoredCandidate};
use crate::catalog::types::{Event, User};
use crate::catalog::{events, profile, registrations, users};
use crate::embedding::{embed_or_absent, EmbeddingProvider};

/// Message shown when no query vector could be built for the user.
pub const PROFILE_INCOMPLETE_MESSAGE: &str =
    "Add a bio or some interests to your profile to get personalized recommendations.";

/// What to show a user.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recommendations {
    /// Ranked events; may be empty when nothing passed the filters.
    Ranked { events: Vec<RecommendedEvent> },
    /// No usable query vector; ask the user to complete their profile.
    ProfileIncomplete { message: String },
}

/// One recommended event with its score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub event_date: String,
    pub score: f32,
    pub similarity: f32,
    pub category_boost: f32,
    pub category_match: bool,
}

/// Inputs that don't come from the store.
#[derive(Debug, Clone)]
pub struct RecommendSettings {
    pub policy: RankPolicy,
    /// Query text for users with an empty profile.
    pub fallback_query: String,
}

/// Recommend upcoming events for `user_id`.
///
/// Events the user already registered for are excluded before ranking. Events
/// whose stored vector is missing or corrupt are skipped; vectors that can't be
/// compared with the query are logged and skipped without failing the request.
pub fn recommend_for_user(
    conn: &Connection,
    provider: &dyn EmbeddingProvider,
    user_id: &str,
    settings: &RecommendSettings,
    now: DateTime<Utc>,
) -> Result<Recommendations> {
    let user = users::get_user(conn, user_id)?;

    let Some(query) = query_vector(&user, provider, &settings.fallback_query) else {
        tracing::info!(user_id, "no query vector available, asking for profile");
        return Ok(Recommendations::ProfileIncomplete {
            message: PROFILE_INCOMPLETE_MESSAGE.to_string(),
        });
    };

    let keywords = user
        .interests
        .as_deref()
        .map(profile::interest_keywords)
        .unwrap_or_default();

    let registered = registrations::registered_event_ids(conn, user_id)?;
    let candidates: Vec<Candidate<Event>> = events::upcoming_events(conn, now)?
        .into_iter()
        .filter(|e| !registered.contains(&e.id))
        .map(into_candidate)
        .collect();

    let ranking = rank(&query, &candidates, &keywords, &settings.policy)?;

    for rejected in &ranking.rejected {
        tracing::warn!(
            user_id,
            event_id = %rejected.candidate.key.id,
            error = %rejected.error,
            "skipping event that cannot be compared"
        );
    }

    let recommended: Vec<RecommendedEvent> =
        ranking.results.iter().map(RecommendedEvent::from).collect();

    tracing::info!(
        user_id,
        candidates = candidates.len(),
        excluded_registered = registered.len(),
        keywords = keywords.len(),
        returned = recommended.len(),
        "recommendations ranked"
    );

    Ok(Recommendations::Ranked {
        events: recommended,
    })
}

/// The user's stored profile vector, or a fresh embedding of their profile text
/// (the fallback phrase when the profile is empty). `None` if the provider fails.
pub fn query_vector(
    user: &User,
    provider: &dyn EmbeddingProvider,
    fallback_query: &str,
) -> Option<Vec<f32>> {
    if let Some(ref stored) = user.embedding {
        return Some(stored.clone());
    }

    let text = profile::user_profile_text(user.bio.as_deref(), user.interests.as_deref())
        .unwrap_or_else(|| fallback_query.to_string());
    tracing::debug!(user_id = %user.id, "embedding query text on demand");
    embed_or_absent(provider, &text)
}

fn into_candidate(mut event: Event) -> Candidate<Event> {
    let embedding = event.embedding.take();
    let category = event.category.clone();
    Candidate {
        key: event,
        embedding,
        category,
    }
}

impl From<&ScoredCandidate<'_, Event>> for RecommendedEvent {
    fn from(scored: &ScoredCandidate<'_, Event>) -> Self {
        let event = &scored.candidate.key;
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            category: event.category.clone(),
            event_date: event.event_date.clone(),
            score: scored.score,
            similarity: scored.similarity,
            category_boost: scored.boost,
            category_match: scored.category_match,
        }
    }
}
