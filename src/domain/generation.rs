use serde::{Deserialize, Serialize};

/// Text produced by one `generate` call together with the tokens it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub text: String,
    pub tokens_used: u64,
}
