use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::LlmError;

/// Closed set of supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Anthropic];

    /// Canonical lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Human-facing vendor label.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Case-insensitive lookup. Surrounding whitespace is not stripped, so
    /// `" openai"` is rejected like any other unsupported identifier.
    pub fn parse(identifier: &str) -> Result<Self, LlmError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(identifier))
            .ok_or_else(|| LlmError::unknown_provider(identifier))
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderKind;
    use crate::domain::LlmError;

    #[test]
    fn parse_is_case_insensitive() {
        for identifier in ["openai", "OpenAI", "OPENAI", "oPeNaI"] {
            assert_eq!(
                ProviderKind::parse(identifier).expect("openai spelling should parse"),
                ProviderKind::OpenAi
            );
        }
        for identifier in ["anthropic", "Anthropic", "ANTHROPIC"] {
            assert_eq!(
                identifier
                    .parse::<ProviderKind>()
                    .expect("anthropic spelling should parse"),
                ProviderKind::Anthropic
            );
        }
    }

    #[test]
    fn parse_rejects_unsupported_identifiers() {
        for identifier in ["mistral", "", " openai", "open-ai", "claude"] {
            let error = ProviderKind::parse(identifier).expect_err("identifier should fail");
            assert_eq!(error, LlmError::unknown_provider(identifier));
        }
    }

    #[test]
    fn serde_uses_canonical_identifiers() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAi).expect("kind should serialize"),
            "\"openai\""
        );
        assert_eq!(
            serde_json::from_str::<ProviderKind>("\"anthropic\"")
                .expect("kind should deserialize"),
            ProviderKind::Anthropic
        );
    }

    #[test]
    fn display_and_label_differ() {
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
        assert_eq!(ProviderKind::OpenAi.label(), "OpenAI");
        assert_eq!(ProviderKind::Anthropic.label(), "Anthropic");
    }
}
