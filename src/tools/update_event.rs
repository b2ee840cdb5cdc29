use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Partial event update; omitted fields keep their current value.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateEventParams {
    #[schemars(description = "ID of the event to update")]
    pub event_id: String,

    #[schemars(description = "New title")]
    pub title: Option<String>,

    #[schemars(description = "New description")]
    pub description: Option<String>,

    #[schemars(description = "New venue or city")]
    pub location: Option<String>,

    #[schemars(description = "New category label")]
    pub category: Option<String>,

    #[schemars(description = "New start time as an RFC 3339 timestamp")]
    pub event_date: Option<String>,

    #[schemars(description = "Set to false to close the event, true to reopen it")]
    pub is_active: Option<bool>,
}
