//! Context budgeting: fit system text, history, and evidence into the
//! generation model's token ceiling.
//!
//! Counts are exact — the tokenizer is the one matching the configured
//! generation model, not an estimate. History is admitted newest-first
//! (recency over completeness) and re-ordered chronologically; evidence
//! is admitted in similarity rank order on the same running total. An
//! oversized user prompt short-circuits with `needs_compression` instead
//! of crowding out everything else.

use tiktoken_rs::CoreBPE;

use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_core::types::{ContextSelection, Message};

pub struct ContextBudgeter {
    bpe: CoreBPE,
    token_ceiling: usize,
    user_ceiling: usize,
}

impl ContextBudgeter {
    /// `model` selects the tokenizer (e.g. "gpt-4o" → o200k_base).
    pub fn new(model: &str, token_ceiling: usize, user_ceiling: usize) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| BankpilotError::Config(format!("no tokenizer for model '{model}': {e}")))?;
        Ok(Self { bpe, token_ceiling, user_ceiling })
    }

    /// Exact token count for `text` under the target model's tokenizer.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Select the history turns and evidence chunks that fit the ceiling.
    ///
    /// The returned selection's total (system + user + history +
    /// evidence) never exceeds `token_ceiling`. Deterministic for fixed
    /// inputs.
    pub fn fit(
        &self,
        system_text: &str,
        user_prompt: &str,
        history: &[Message],
        ranked_evidence: &[String],
    ) -> ContextSelection {
        let system_tokens = self.count_tokens(system_text);
        let user_tokens = self.count_tokens(user_prompt);

        // Hard precondition, not a soft trim: the caller must shrink the
        // user input and retry.
        if user_tokens > self.user_ceiling {
            return ContextSelection {
                history: Vec::new(),
                evidence: Vec::new(),
                needs_compression: true,
            };
        }

        let mut total = system_tokens + user_tokens;

        // Newest-first walk; first overflow stops the walk and silently
        // drops everything older.
        let mut selected_history = Vec::new();
        for turn in history.iter().rev() {
            let tokens = self.count_tokens(&turn.content);
            if total + tokens > self.token_ceiling {
                break;
            }
            total += tokens;
            selected_history.push(turn.clone());
        }
        selected_history.reverse();

        // Same running total, rank order.
        let mut selected_evidence = Vec::new();
        for chunk in ranked_evidence {
            let tokens = self.count_tokens(chunk);
            if total + tokens > self.token_ceiling {
                break;
            }
            total += tokens;
            selected_evidence.push(chunk.clone());
        }

        ContextSelection {
            history: selected_history,
            evidence: selected_evidence,
            needs_compression: false,
        }
    }
}
