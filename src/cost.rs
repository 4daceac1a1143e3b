use once_cell::sync::Lazy;
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::config::{ESTIMATED_OUTPUT_TOKENS, RECOMMENDATION_PROMPT_PADDING_TOKENS};
use crate::error::{AppError, Result};
use crate::types::{CostEstimate, ModelId};

/// Both supported models tokenize with the cl100k BPE vocabulary, which
/// ships embedded in the tokenizer crate.
static BPE: Lazy<CoreBPE> = Lazy::new(|| cl100k_base().expect("embedded cl100k vocabulary"));

/// Number of tokens `text` consumes under the reference tokenizer.
/// Deterministic and offline — this is what makes the count usable as a
/// pre-flight gate for the eventual real call.
pub fn count_tokens(text: &str) -> usize {
    BPE.encode_with_special_tokens(text).len()
}

/// USD per 1,000 input/output tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub usd_per_1k_input: f64,
    pub usd_per_1k_output: f64,
}

static PRICING_TABLE: &[(ModelId, ModelPricing)] = &[
    (
        ModelId::Gpt35Turbo,
        ModelPricing {
            usd_per_1k_input: 0.0005,
            usd_per_1k_output: 0.0015,
        },
    ),
    (
        ModelId::Gpt4TurboPreview,
        ModelPricing {
            usd_per_1k_input: 0.01,
            usd_per_1k_output: 0.03,
        },
    ),
];

pub fn pricing_for(model: ModelId) -> Option<ModelPricing> {
    PRICING_TABLE
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, p)| *p)
}

/// Convert a token budget into US dollars for `model`.
pub fn estimate_cost(input_tokens: usize, output_tokens: usize, model: ModelId) -> Result<f64> {
    let pricing =
        pricing_for(model).ok_or_else(|| AppError::UnknownModel(model.to_string()))?;
    Ok(input_tokens as f64 / 1000.0 * pricing.usd_per_1k_input
        + output_tokens as f64 / 1000.0 * pricing.usd_per_1k_output)
}

/// Predict the cost of a full analysis run from its summary prompts.
///
/// The recommendation-stage prompt is built from summaries that don't
/// exist yet, so a fixed input padding stands in for it, and output size
/// is a fixed assumption. An estimate, not a bound.
pub fn estimate_run_cost(prompts: &[&str], model: ModelId) -> Result<CostEstimate> {
    let prompt_tokens: usize = prompts.iter().map(|p| count_tokens(p)).sum();
    let input_tokens = prompt_tokens + RECOMMENDATION_PROMPT_PADDING_TOKENS;
    let output_tokens = ESTIMATED_OUTPUT_TOKENS;

    Ok(CostEstimate {
        input_tokens,
        output_tokens,
        model,
        cost_usd: estimate_cost(input_tokens, output_tokens, model)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_counts_zero_tokens() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn counting_is_deterministic_and_grows_with_text() {
        let text = "The app keeps crashing on launch since the last update.";
        let count = count_tokens(text);
        assert!(count > 0);
        assert_eq!(count, count_tokens(text));

        let doubled = format!("{text} {text}");
        assert!(count_tokens(&doubled) > count);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        for model in [ModelId::Gpt35Turbo, ModelId::Gpt4TurboPreview] {
            assert_eq!(estimate_cost(0, 0, model).unwrap(), 0.0);
        }
    }

    #[test]
    fn cost_matches_published_rates() {
        // 2000/1000 * 0.0005 + 1000/1000 * 0.0015
        let cost = estimate_cost(2000, 1000, ModelId::Gpt35Turbo).unwrap();
        assert!((cost - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn cost_is_monotone_in_both_token_counts() {
        let base = estimate_cost(1000, 1000, ModelId::Gpt4TurboPreview).unwrap();
        assert!(estimate_cost(2000, 1000, ModelId::Gpt4TurboPreview).unwrap() > base);
        assert!(estimate_cost(1000, 2000, ModelId::Gpt4TurboPreview).unwrap() > base);
    }

    #[test]
    fn run_estimate_includes_recommendation_padding_and_output_assumption() {
        let prompt = "Summarize these reviews.";
        let estimate = estimate_run_cost(&[prompt], ModelId::Gpt35Turbo).unwrap();
        assert_eq!(
            estimate.input_tokens,
            count_tokens(prompt) + RECOMMENDATION_PROMPT_PADDING_TOKENS
        );
        assert_eq!(estimate.output_tokens, ESTIMATED_OUTPUT_TOKENS);
        assert!(estimate.cost_usd > 0.0);
    }

    #[test]
    fn run_estimate_with_no_prompts_still_carries_the_paddings() {
        let estimate = estimate_run_cost(&[], ModelId::Gpt35Turbo).unwrap();
        assert_eq!(estimate.input_tokens, RECOMMENDATION_PROMPT_PADDING_TOKENS);
    }
}
