use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Replaces both bio and interests; omitted fields are cleared.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateProfileParams {
    #[schemars(description = "ID of the user whose profile is updated")]
    pub user_id: String,

    #[schemars(description = "New bio. Omit to clear.")]
    pub bio: Option<String>,

    #[schemars(description = "New comma-separated interests. Omit to clear.")]
    pub interests: Option<String>,
}
