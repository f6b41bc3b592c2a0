//! Token estimation against a target model's context budget.

use crate::message::Message;

/// The target model's identity and how much room it leaves for
/// context. The Context Manager doesn't read this off a Router
/// configuration directly — callers that already resolved a model via
/// the Router pass its window through here, keeping this crate
/// decoupled from the Router's backend/model schema.
#[derive(Debug, Clone)]
pub struct ModelBudget {
    /// Model identifier, carried through for logging only.
    pub model_id: String,
    /// Total context window, in tokens.
    pub context_window_tokens: usize,
    /// Fraction of the window reserved for the model's own reply and
    /// the newly-arrived user message, never available to stored
    /// history.
    pub reserved_fraction: f32,
}

impl ModelBudget {
    /// A budget for `model_id` with `context_window_tokens` total,
    /// reserving a quarter of it for the reply and new message.
    pub fn new(model_id: impl Into<String>, context_window_tokens: usize) -> Self {
        Self { model_id: model_id.into(), context_window_tokens, reserved_fraction: 0.25 }
    }

    /// Tokens available for stored history after the reserve.
    pub fn history_budget(&self) -> usize {
        let reserved = (self.context_window_tokens as f32 * self.reserved_fraction) as usize;
        self.context_window_tokens.saturating_sub(reserved)
    }
}

/// Approximates token counts from character counts, the same
/// chars-per-token heuristic used throughout the pipeline wherever an
/// exact tokenizer isn't worth pulling in for a budget check.
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl TokenEstimator {
    /// A new estimator with a custom chars-per-token ratio.
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self { chars_per_token: chars_per_token.max(1) }
    }

    /// Per-message overhead for role/formatting, in tokens.
    const MESSAGE_OVERHEAD_TOKENS: usize = 4;

    /// Estimated token count for one message.
    pub fn message_tokens(&self, message: &Message) -> usize {
        message.text.len() / self.chars_per_token + Self::MESSAGE_OVERHEAD_TOKENS
    }

    /// Estimated token count for a whole message list.
    pub fn total_tokens(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.message_tokens(m)).sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::with_ratio(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn estimates_four_chars_per_token_plus_overhead() {
        let estimator = TokenEstimator::default();
        let message = Message::user("a".repeat(400), Utc::now());
        assert_eq!(estimator.message_tokens(&message), 104);
    }

    #[test]
    fn history_budget_reserves_a_quarter_by_default() {
        let budget = ModelBudget::new("stub-model", 1000);
        assert_eq!(budget.history_budget(), 750);
    }
}
