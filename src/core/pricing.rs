//! Token usage extraction and cost estimation

use serde::Serialize;
use tracing::warn;

use crate::core::models::{AnalysisResponse, UsageStats};

/// Price per million tokens, split by direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPricing {
    /// USD per million prompt tokens
    pub input_per_million: f64,
    /// USD per million completion tokens
    pub output_per_million: f64,
}

impl ModelPricing {
    /// Rates in USD per million tokens
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// USD cost of one call
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let input = prompt_tokens as f64 / 1_000_000.0 * self.input_per_million;
        let output = completion_tokens as f64 / 1_000_000.0 * self.output_per_million;
        input + output
    }
}

/// Pricing for every model id containing `key` (lower-cased)
#[derive(Debug, Clone, Copy)]
pub struct PricingRule {
    /// Substring matched against the lower-cased model id
    pub key: &'static str,
    /// Rates applied on a match
    pub pricing: ModelPricing,
}

impl PricingRule {
    /// Whether this rule covers an already lower-cased model id
    pub fn matches(&self, model_id: &str) -> bool {
        model_id.contains(self.key)
    }
}

const PRO_3: ModelPricing = ModelPricing::new(2.00, 12.00);
const FLASH_3: ModelPricing = ModelPricing::new(0.075, 0.30);
const PRO_15: ModelPricing = ModelPricing::new(1.25, 5.00);
const FLASH_15: ModelPricing = ModelPricing::new(0.075, 0.30);

/// Evaluated top to bottom, first match wins.
///
/// Longer ids sit above the shorter ids they contain, so a short key can
/// never shadow a more specific one.
pub const PRICING_RULES: &[PricingRule] = &[
    PricingRule { key: "gemini-3-pro-preview", pricing: PRO_3 },
    PricingRule { key: "gemini-3-pro", pricing: PRO_3 },
    PricingRule { key: "gemini-3-flash", pricing: FLASH_3 },
    PricingRule { key: "gemini-1.5-pro", pricing: PRO_15 },
    PricingRule { key: "gemini-1.5-flash", pricing: FLASH_15 },
];

/// Used when no rule matches: 1.5 Pro rates, never zero
pub const DEFAULT_PRICING: ModelPricing = PRO_15;

/// Pricing tier for `model_id`, falling back to [`DEFAULT_PRICING`]
pub fn pricing_for(model_id: &str) -> ModelPricing {
    let normalized = model_id.to_lowercase();
    match PRICING_RULES.iter().find(|r| r.matches(&normalized)) {
        Some(rule) => rule.pricing,
        None => {
            warn!("No pricing for model {}, using default rates", model_id);
            DEFAULT_PRICING
        }
    }
}

/// USD cost of a call to `model_id`
pub fn calculate_cost(model_id: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    pricing_for(model_id).cost(prompt_tokens, completion_tokens)
}

/// Derive token counts and estimated cost from a response
///
/// A response without usage metadata yields all zeros.
pub fn extract_usage(response: &AnalysisResponse, model_id: &str) -> UsageStats {
    if response.usage_metadata.is_none() {
        return UsageStats::default();
    }

    let prompt_tokens = response.prompt_tokens();
    let completion_tokens = response.completion_tokens();
    let total_tokens = response.total_tokens();

    UsageStats::new(
        prompt_tokens,
        completion_tokens,
        total_tokens,
        calculate_cost(model_id, prompt_tokens, completion_tokens),
    )
}
