//! Serving-endpoint model catalog and translation cost calculation.
//!
//! Single source of truth for:
//! - `ModelInfo` (catalog key, endpoint id, display name, per-million rates)
//! - `calculate_llm_cost()` with default-model fallback
//! - `TokenUsage` accumulated per translation and per job

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

/// One serving-endpoint model usable for translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub key: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub pricing: ModelPricing,
}

/// Endpoint id used when a request does not name a model.
pub const DEFAULT_MODEL_ID: &str = "databricks-llama-4-maverick";

/// Models available on the serving endpoint.
pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "llama-maverick",
        id: "databricks-llama-4-maverick",
        name: "Llama 4 Maverick",
        description: "Fast and efficient for general tasks (Default)",
        pricing: ModelPricing { input: 0.15, output: 0.60 },
    },
    ModelInfo {
        key: "llama-70b",
        id: "databricks-meta-llama-3-3-70b-instruct",
        name: "Llama 3.3 70B",
        description: "Powerful model for complex reasoning",
        pricing: ModelPricing { input: 0.20, output: 0.80 },
    },
    ModelInfo {
        key: "llama-405b",
        id: "databricks-meta-llama-3-1-405b-instruct",
        name: "Llama 3.1 405B",
        description: "Largest Llama model for most complex tasks",
        pricing: ModelPricing { input: 0.50, output: 2.00 },
    },
    ModelInfo {
        key: "claude-sonnet-4-5",
        id: "databricks-claude-sonnet-4-5",
        name: "Claude Sonnet 4.5",
        description: "Latest Claude model with superior reasoning",
        pricing: ModelPricing { input: 3.00, output: 15.00 },
    },
    ModelInfo {
        key: "claude-opus-4-1",
        id: "databricks-claude-opus-4-1",
        name: "Claude Opus 4.1",
        description: "Most powerful Claude model",
        pricing: ModelPricing { input: 15.00, output: 75.00 },
    },
    ModelInfo {
        key: "gpt-5",
        id: "databricks-gpt-5",
        name: "GPT-5",
        description: "Latest OpenAI model",
        pricing: ModelPricing { input: 2.50, output: 10.00 },
    },
    ModelInfo {
        key: "gemini-2-5-pro",
        id: "databricks-gemini-2-5-pro",
        name: "Gemini 2.5 Pro",
        description: "Google's most capable model",
        pricing: ModelPricing { input: 1.25, output: 5.00 },
    },
];

/// Look up a model by endpoint id or catalog key.
pub fn lookup_model(model_id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS
        .iter()
        .find(|m| m.id == model_id || m.key == model_id)
}

/// Estimated USD cost of one completion.
///
/// Unknown models are charged at the default model's rates.
pub fn calculate_llm_cost(model_id: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let pricing = lookup_model(model_id)
        .or_else(|| lookup_model(DEFAULT_MODEL_ID))
        .map(|m| m.pricing)
        .unwrap_or(ModelPricing { input: 0.15, output: 0.60 });

    let input_cost = prompt_tokens as f64 / 1_000_000.0 * pricing.input;
    let output_cost = completion_tokens as f64 / 1_000_000.0 * pricing.output;
    input_cost + output_cost
}

/// Accumulated token counts and cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
pub struct TokenUsage {
    #[ts(type = "number")]
    pub prompt_tokens: u64,
    #[ts(type = "number")]
    pub completion_tokens: u64,
    #[ts(type = "number")]
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.estimated_cost_usd += other.estimated_cost_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_key() {
        assert_eq!(
            lookup_model("databricks-gpt-5").map(|m| m.name),
            Some("GPT-5")
        );
        assert_eq!(
            lookup_model("claude-sonnet-4-5").map(|m| m.id),
            Some("databricks-claude-sonnet-4-5")
        );
        assert!(lookup_model("nonexistent").is_none());
    }

    #[test]
    fn test_default_model_is_in_catalog() {
        assert!(lookup_model(DEFAULT_MODEL_ID).is_some());
    }

    #[test]
    fn test_calculate_cost_known_model() {
        // 1M input at $3 + 1M output at $15
        let cost = calculate_llm_cost("databricks-claude-sonnet-4-5", 1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_unknown_model_uses_default() {
        let cost = calculate_llm_cost("mystery-model", 2_000_000, 1_000_000);
        assert!((cost - (0.30 + 0.60)).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_zero_tokens() {
        assert_eq!(calculate_llm_cost(DEFAULT_MODEL_ID, 0, 0), 0.0);
    }

    #[test]
    fn test_token_usage_add() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            estimated_cost_usd: 0.5,
        });
        total.add(&TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
            estimated_cost_usd: 0.25,
        });
        assert_eq!(total.prompt_tokens, 11);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, 18);
        assert!((total.estimated_cost_usd - 0.75).abs() < 1e-9);
    }
}
