use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsertMemoryParams {
    #[schemars(description = "Descriptive key for this memory")]
    pub key: String,

    #[schemars(description = "The information to remember")]
    pub text: String,
}

/// `log_interaction` stores through the same endpoint; the free text is
/// called `summary` in its catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogInteractionParams {
    #[schemars(description = "Descriptive key for this interaction")]
    pub key: String,

    #[schemars(description = "Summary of the issue and resolution")]
    pub summary: String,
}
