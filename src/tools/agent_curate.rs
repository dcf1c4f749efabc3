use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How thoroughly the service-side agent should extract facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[schemars(inline)]
pub enum Importance {
    /// Extract every detail, even minor facts.
    High,
    /// Key facts and important details.
    Medium,
    /// Critical information only.
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentCurateParams {
    #[schemars(description = "The information to curate and store")]
    pub text: String,

    #[schemars(
        description = "How thoroughly to extract facts: 'high' (extract everything), 'medium' (key facts), 'low' (critical only)"
    )]
    pub importance: Importance,

    #[schemars(description = "Which model the internal curation agent should use")]
    pub model_id: Option<String>,

    #[schemars(description = "AWS region where the internal agent's model runs")]
    pub bedrock_region: Option<String>,

    #[schemars(
        description = "Milliseconds to wait between each memory insertion (prevents rate limiting)"
    )]
    pub timeout_ms: Option<u64>,
}
