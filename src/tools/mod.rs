pub mod create_event;
pub mod create_user;
pub mod recommend_events;
pub mod register_event;
pub mod update_event;
pub mod update_profile;

use chrono::{DateTime, Utc};
use create_event::CreateEventParams;
use create_user::CreateUserParams;
use recommend_events::RecommendEventsParams;
use register_event::RegisterEventParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use update_event::UpdateEventParams;
use update_profile::UpdateProfileParams;

use eventmatch::catalog::events::EventChanged;
use eventmatch::catalog::types::{EventUpdate, NewEvent, NewUser, UserRole};
use eventmatch::catalog::{events, profile, registrations, users};
use eventmatch::config::EventMatchConfig;
use eventmatch::embedding::{embed_or_absent, EmbeddingProvider};
use eventmatch::recommend::recommend_for_user;

const MAX_RESULTS_CAP: usize = 50;
const UPDATE_ATTEMPTS: u32 = 3;

/// The EventMatch MCP tool handler. Holds shared state (db connection, embedding
/// provider, config) and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct EventMatchTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: Arc<EventMatchConfig>,
}

#[tool_router]
impl EventMatchTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<EventMatchConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            embedding,
            config,
        }
    }

    /// Create a user account with an optional profile.
    #[tool(description = "Create a user. Role is 'organizer' or 'attendee' (default). Bio and interests drive recommendations.")]
    async fn create_user(
        &self,
        Parameters(params): Parameters<CreateUserParams>,
    ) -> Result<String, String> {
        if params.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        let role = match params.role.as_deref() {
            Some(r) => r.parse::<UserRole>()?,
            None => UserRole::Attendee,
        };

        tracing::info!(role = %role, "create_user called");

        let text = profile::user_profile_text(params.bio.as_deref(), params.interests.as_deref());
        let embedding = self.embed_text(text).await?;

        let new_user = NewUser {
            name: params.name,
            role,
            bio: params.bio,
            interests: params.interests,
        };
        let user = self
            .with_db(move |conn| users::create_user(conn, &new_user, embedding.as_deref()))
            .await?;

        serde_json::to_string(&user).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Replace a user's bio and interests.
    #[tool(description = "Update a user's bio and interests. Both fields are replaced; the profile embedding is recomputed.")]
    async fn update_profile(
        &self,
        Parameters(params): Parameters<UpdateProfileParams>,
    ) -> Result<String, String> {
        tracing::info!(user_id = %params.user_id, "update_profile called");

        let text = profile::user_profile_text(params.bio.as_deref(), params.interests.as_deref());
        let embedding = self.embed_text(text).await?;

        let user = self
            .with_db(move |conn| {
                users::update_profile(
                    conn,
                    &params.user_id,
                    params.bio.as_deref(),
                    params.interests.as_deref(),
                    embedding.as_deref(),
                )
            })
            .await?;

        serde_json::to_string(&user).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Publish a new event.
    #[tool(description = "Create an event. Title, description and location are embedded for matching; category is matched against attendee interests.")]
    async fn create_event(
        &self,
        Parameters(params): Parameters<CreateEventParams>,
    ) -> Result<String, String> {
        if params.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        let event_date = parse_event_date(&params.event_date)?;

        tracing::info!(title = %params.title, "create_event called");

        let new_event = NewEvent {
            title: params.title,
            description: params.description.unwrap_or_default(),
            location: params.location.unwrap_or_default(),
            category: params.category,
            event_date,
            organizer_id: params.organizer_id,
        };
        let text = profile::event_profile_text(
            &new_event.title,
            &new_event.description,
            &new_event.location,
        );
        let embedding = self.embed_text(text).await?;

        let event = self
            .with_db(move |conn| events::create_event(conn, &new_event, embedding.as_deref()))
            .await?;

        serde_json::to_string(&event).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Change an existing event.
    #[tool(description = "Update an event. Omitted fields are unchanged. Changing title, description or location recomputes the event embedding. Set is_active=false to close an event.")]
    async fn update_event(
        &self,
        Parameters(params): Parameters<UpdateEventParams>,
    ) -> Result<String, String> {
        let event_date = params
            .event_date
            .as_deref()
            .map(parse_event_date)
            .transpose()?;
        let update = EventUpdate {
            title: params.title,
            description: params.description,
            location: params.location,
            category: params.category,
            event_date,
            is_active: params.is_active,
        };

        tracing::info!(
            event_id = %params.event_id,
            changes_text = update.changes_text(),
            "update_event called"
        );

        let provider = Arc::clone(&self.embedding);
        let event_id = params.event_id;

        // Read, embed and write under one lock; a writer from another process
        // surfaces as `EventChanged` and the update is redone from a fresh read.
        let event = self
            .with_db(move |conn| {
                let mut attempt = 1;
                loop {
                    let result = events::update_event(conn, &event_id, &update, |text| {
                        embed_or_absent(provider.as_ref(), text)
                    });
                    match result {
                        Err(e) if e.is::<EventChanged>() && attempt < UPDATE_ATTEMPTS => {
                            tracing::debug!(event_id = %event_id, attempt, "retrying event update");
                            attempt += 1;
                        }
                        other => return other,
                    }
                }
            })
            .await?;

        serde_json::to_string(&event).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Register a user for an event.
    #[tool(description = "Register a user for an event. Registered events are excluded from that user's recommendations. Registering twice is a no-op.")]
    async fn register_event(
        &self,
        Parameters(params): Parameters<RegisterEventParams>,
    ) -> Result<String, String> {
        tracing::info!(
            user_id = %params.user_id,
            event_id = %params.event_id,
            "register_event called"
        );

        let outcome = self
            .with_db(move |conn| {
                registrations::register_for_event(conn, &params.user_id, &params.event_id)
            })
            .await?;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Recommend upcoming events for a user.
    #[tool(description = "Recommend upcoming events for a user, ranked by profile similarity with a boost for categories matching their interests. Excludes events they registered for.")]
    async fn recommend_events(
        &self,
        Parameters(params): Parameters<RecommendEventsParams>,
    ) -> Result<String, String> {
        let limit = params.max_results.map(|n| n.clamp(1, MAX_RESULTS_CAP));
        tracing::info!(user_id = %params.user_id, limit = ?limit, "recommend_events called");

        let settings = self.config.recommendation.settings(limit);
        let provider = Arc::clone(&self.embedding);
        let user_id = params.user_id;

        // The provider may be called for users without a stored vector, so the
        // whole pass stays on the blocking pool.
        let recommendations = self
            .with_db(move |conn| {
                recommend_for_user(conn, provider.as_ref(), &user_id, &settings, Utc::now())
            })
            .await?;

        serde_json::to_string(&recommendations).map_err(|e| format!("serialization failed: {e}"))
    }
}

impl EventMatchTools {
    /// Embed `text` on the blocking pool. Provider failures and empty text
    /// both yield `None`; only a panicked task is an error.
    async fn embed_text(&self, text: Option<String>) -> Result<Option<Vec<f32>>, String> {
        let Some(text) = text else {
            return Ok(None);
        };
        let provider = Arc::clone(&self.embedding);
        tokio::task::spawn_blocking(move || embed_or_absent(provider.as_ref(), &text))
            .await
            .map_err(|e| format!("embedding task failed: {e}"))
    }

    /// Run `f` against the locked connection on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&*conn)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| e.to_string())
    }
}

fn parse_event_date(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid event_date '{raw}': {e}"))
}

#[tool_handler]
impl ServerHandler for EventMatchTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "EventMatch recommends events to attendees. Use create_user and update_profile \
                 to describe people, create_event to publish events, register_event to sign up, \
                 and recommend_events to get a ranked list for a user."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
