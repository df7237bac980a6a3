//! Character-count approximation used when no real token count is available.
//!
//! This is not a tokenizer: it divides the prompt's character count by four
//! and truncates. It does not model any particular vendor's tokenization and
//! ignores the model name.

const CHARS_PER_TOKEN: usize = 4;

pub fn estimate_tokens(prompt: &str) -> u64 {
    let tokens = prompt.chars().count() / CHARS_PER_TOKEN;
    u64::try_from(tokens).unwrap_or(u64::MAX)
}

/// Running per-instance token total. Never decreases.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TokenCounter {
    total: u64,
}

impl TokenCounter {
    pub(crate) fn record(&mut self, tokens: u64) {
        self.total = self.total.saturating_add(tokens);
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }
}
