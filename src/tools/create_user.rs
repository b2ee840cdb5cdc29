use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateUserParams {
    #[schemars(description = "Display name")]
    pub name: String,

    #[schemars(description = "Account role: 'organizer' or 'attendee'. Defaults to 'attendee'.")]
    pub role: Option<String>,

    #[schemars(description = "Free-text bio")]
    pub bio: Option<String>,

    #[schemars(description = "Comma-separated interests, e.g. 'hiking, nature, jazz'")]
    pub interests: Option<String>,
}
