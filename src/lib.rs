//! Personalized event recommendations for an event-management platform.
//!
//! User profiles (bio + interests) and event listings (title, description,
//! location) are embedded into vectors. For each user, upcoming events they
//! haven't registered for are ranked by cosine similarity, with a fixed boost
//! for events whose category shares a word with the user's interests:
//!
//! | Case | Kept when | Score |
//! |------|-----------|-------|
//! | Category matches an interest | always | similarity + boost |
//! | No category match | score ≥ threshold | similarity |
//! | No stored embedding | never | none |
//!
//! # Architecture
//!
//! - **Storage**: SQLite; vectors stored as JSON text alongside each record
//! - **Embeddings**: OpenAI-compatible `/embeddings` API (`text-embedding-3-small`, 1536 dimensions)
//! - **Ranking**: pure, stable, and truncated to a configurable top-N
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP (`/mcp`, plus `/health`)
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`embedding`]: Embedding provider trait and the OpenAI-backed implementation
//! - [`catalog`]: Users, events, and registrations
//! - [`recommend`]: Vector codec, cosine similarity, ranking policy, and orchestration

pub mod catalog;
pub mod config;
pub mod db;
pub mod embedding;
pub mod recommend;
