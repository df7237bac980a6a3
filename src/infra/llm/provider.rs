use crate::domain::{GenerationOutput, LlmError, ProviderKind};

use super::response_parsing::canned_response;
use super::token_estimate::estimate_tokens;

/// A request-scoped generation backend with its own token counter.
///
/// Implementations advance the counter only after a successful call, so a
/// failed, timed out or cancelled `generate` leaves `token_usage` unchanged.
pub trait LlmProvider: Send {
    fn kind(&self) -> ProviderKind;

    fn generate(&mut self, prompt: &str, model: &str) -> Result<String, LlmError>;

    fn token_usage(&self) -> u64;

    /// Runs `generate` and reports the tokens this call added to the counter.
    fn generate_output(
        &mut self,
        prompt: &str,
        model: &str,
    ) -> Result<GenerationOutput, LlmError> {
        let before = self.token_usage();
        let text = self.generate(prompt, model)?;
        Ok(GenerationOutput {
            text,
            tokens_used: self.token_usage().saturating_sub(before),
        })
    }
}

/// Text returned by a backend plus the token count the vendor reported, if any.
pub(crate) struct Completion {
    pub(crate) text: String,
    pub(crate) reported_tokens: Option<u64>,
}

impl Completion {
    pub(crate) fn canned(kind: ProviderKind, prompt: &str) -> Self {
        Self {
            text: canned_response(kind.label(), prompt),
            reported_tokens: None,
        }
    }

    /// Vendor-reported usage when present, otherwise the character estimate.
    pub(crate) fn tokens_for(&self, prompt: &str) -> u64 {
        self.reported_tokens.unwrap_or_else(|| estimate_tokens(prompt))
    }
}

/// Only the empty string is rejected; whitespace is a prompt like any other.
pub(crate) fn validate_prompt(prompt: &str) -> Result<(), LlmError> {
    if prompt.is_empty() {
        return Err(LlmError::validation("prompt must not be empty"));
    }
    Ok(())
}
