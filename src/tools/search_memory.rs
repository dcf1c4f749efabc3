//! Parameters shared by `search_memory` and `search_knowledge_base`.

use schemars::JsonSchema;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::SearchDefaults;

/// Semantic search request as the model phrases it.
///
/// All three numeric controls are optional; omitted ones are filled from the
/// configured [`SearchDefaults`] by [`SearchParams::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Natural language query. Accepts `text` as an alias.
    #[serde(alias = "text")]
    #[schemars(description = "What to search for")]
    pub query: String,

    #[schemars(
        description = "Search radius (0.1-0.5). Lower = stricter. Use 0.2 for safety-critical queries, 0.3 for general ones."
    )]
    pub epsilon: Option<f64>,

    #[schemars(
        description = "Minimum similarity (0.0-1.0). Use 0.7+ for safety-critical queries, 0.5 for general ones."
    )]
    pub threshold: Option<f64>,

    /// Models sometimes send `3.0`; any whole number is accepted.
    #[serde(default, deserialize_with = "whole_number")]
    #[schemars(with = "Option<u32>")]
    #[schemars(description = "Maximum number of results (1-10). 3-5 suits most queries.")]
    pub top_k: Option<u32>,
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Option::<f64>::deserialize(deserializer)?
        .map(|n| {
            if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) {
                Ok(n as u32)
            } else {
                Err(D::Error::custom(format!(
                    "top_k must be a whole number, got {n}"
                )))
            }
        })
        .transpose()
}

/// Search controls after defaults were applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedSearch {
    pub epsilon: f64,
    pub threshold: f64,
    pub top_k: u32,
}

impl SearchParams {
    pub fn resolve(&self, defaults: &SearchDefaults) -> ResolvedSearch {
        ResolvedSearch {
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
            threshold: self.threshold.unwrap_or(defaults.threshold),
            top_k: self.top_k.unwrap_or(defaults.top_k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_fills_only_missing_controls() {
        let params: SearchParams =
            serde_json::from_value(serde_json::json!({"query": "allergy", "threshold": 0.7}))
                .unwrap();
        let resolved = params.resolve(&SearchDefaults::default());
        assert_eq!(resolved.threshold, 0.7);
        assert_eq!(resolved.epsilon, 0.3);
        assert_eq!(resolved.top_k, 5);
    }

    #[test]
    fn text_is_accepted_as_query_alias() {
        let params: SearchParams = serde_json::from_value(serde_json::json!({
            "agent_id": "sarah",
            "text": "programming languages",
            "top_k": 3
        }))
        .unwrap();
        assert_eq!(params.query, "programming languages");
        assert_eq!(params.top_k, Some(3));
    }

    #[test]
    fn top_k_accepts_integral_floats_only() {
        let params: SearchParams =
            serde_json::from_value(serde_json::json!({"query": "q", "top_k": 3.0})).unwrap();
        assert_eq!(params.top_k, Some(3));

        let params: SearchParams =
            serde_json::from_value(serde_json::json!({"query": "q", "top_k": null})).unwrap();
        assert_eq!(params.top_k, None);

        for bad in [serde_json::json!(2.5), serde_json::json!(-1), serde_json::json!("3")] {
            let err = serde_json::from_value::<SearchParams>(
                serde_json::json!({"query": "q", "top_k": bad}),
            )
            .unwrap_err();
            assert!(err.to_string().contains("top_k") || err.to_string().contains("invalid type"), "{err}");
        }
    }
}
