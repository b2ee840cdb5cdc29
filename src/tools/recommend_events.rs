//! MCP `recommend_events` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recommend_events` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecommendEventsParams {
    /// User to recommend events for.
    #[schemars(description = "ID of the user to recommend events for")]
    pub user_id: String,

    /// Maximum number of results (1–50). Defaults to the configured `max_results`.
    #[schemars(description = "Maximum number of events to return (1-50). Defaults to 10.")]
    pub max_results: Option<usize>,
}
