use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateEventParams {
    #[schemars(description = "Event title")]
    pub title: String,

    #[schemars(description = "Event description")]
    pub description: Option<String>,

    #[schemars(description = "Venue or city")]
    pub location: Option<String>,

    #[schemars(description = "Category label, e.g. 'Outdoors & Adventure'")]
    pub category: Option<String>,

    #[schemars(description = "Start time as an RFC 3339 timestamp, e.g. '2030-06-01T18:00:00Z'")]
    pub event_date: String,

    #[schemars(description = "ID of the organizing user")]
    pub organizer_id: Option<String>,
}
