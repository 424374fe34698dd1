//! Per-model cost estimation over token usage.

use rust_decimal::Decimal;
use wick_provider::TokenUsage;

/// Input/output price per million tokens, in USD.
#[derive(Debug, Clone, Copy)]
struct ModelRate {
    input_per_million: Decimal,
    output_per_million: Decimal,
}

impl ModelRate {
    const fn new(input_per_million: i64, output_per_million: i64) -> Self {
        Self {
            input_per_million: Decimal::from_i128_with_scale(input_per_million as i128, 0),
            output_per_million: Decimal::from_i128_with_scale(output_per_million as i128, 0),
        }
    }
}

/// Rate table for known models. Unknown models fall back to
/// [`DEFAULT_RATE`] so estimation never panics on an unrecognized
/// model string.
const KNOWN_RATES: &[(&str, ModelRate)] = &[
    ("claude-opus-4", ModelRate::new(15, 75)),
    ("claude-sonnet-4", ModelRate::new(3, 15)),
    ("claude-haiku-4", ModelRate::new(1, 4)),
];

const DEFAULT_RATE: ModelRate = ModelRate::new(3, 15);

fn rate_for(model: &str) -> ModelRate {
    KNOWN_RATES
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_RATE)
}

/// Estimate the USD cost of one provider call from its token usage,
/// multiplying per-model per-token rates by the observed token counts.
/// Cache tokens are not separately priced — they are folded into the
/// input count at the same rate, since the exact discount schedule is
/// a provider implementation detail this estimator does not model.
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> Decimal {
    let rate = rate_for(model);
    let input_tokens = usage.input_tokens
        + usage.cache_read_tokens.unwrap_or(0)
        + usage.cache_creation_tokens.unwrap_or(0);
    let input_cost = Decimal::from(input_tokens) * rate.input_per_million / Decimal::from(1_000_000u64);
    let output_cost = Decimal::from(usage.output_tokens) * rate.output_per_million / Decimal::from(1_000_000u64);
    input_cost + output_cost
}
