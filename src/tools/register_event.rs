use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RegisterEventParams {
    #[schemars(description = "ID of the registering user")]
    pub user_id: String,

    #[schemars(description = "ID of the event")]
    pub event_id: String,
}
