use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorCategory {
    UserActionRequired,
    Misconfigured,
    TemporaryFailure,
    InternalFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("unknown provider: {identifier}")]
    UnknownProviderKind { identifier: String },
    #[error("LLM module not found: {module_id}")]
    ModuleNotFound { module_id: String },
    #[error("provider authentication failed")]
    Auth,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider quota exceeded")]
    QuotaExceeded,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("provider transport failed: {message}")]
    Transport { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl LlmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unknown_provider(identifier: impl Into<String>) -> Self {
        Self::UnknownProviderKind {
            identifier: identifier.into(),
        }
    }

    pub fn module_not_found(module_id: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module_id: module_id.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> LlmErrorCategory {
        match self {
            Self::Validation { .. }
            | Self::ModuleNotFound { .. }
            | Self::Auth
            | Self::QuotaExceeded => LlmErrorCategory::UserActionRequired,
            Self::UnknownProviderKind { .. } => LlmErrorCategory::Misconfigured,
            Self::RateLimited | Self::Timeout | Self::Transport { .. } => {
                LlmErrorCategory::TemporaryFailure
            }
            Self::InvalidResponse { .. } | Self::Internal { .. } => {
                LlmErrorCategory::InternalFailure
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Transport { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Please review the request: {message}"),
            Self::UnknownProviderKind { identifier } => format!(
                "Provider '{identifier}' is not supported. Use one of: openai, anthropic."
            ),
            Self::ModuleNotFound { module_id } => {
                format!("LLM module '{module_id}' does not exist.")
            }
            Self::Auth => {
                "Authentication failed. Check your provider API key and configuration.".to_string()
            }
            Self::RateLimited => {
                "The provider is rate limiting requests. Please retry in a moment.".to_string()
            }
            Self::QuotaExceeded => {
                "The provider account has exhausted its quota. Check billing and limits."
                    .to_string()
            }
            Self::Timeout => "The provider did not respond in time. Please retry.".to_string(),
            Self::InvalidResponse { message } => {
                format!("The provider returned an invalid response: {message}")
            }
            Self::Transport { message } => {
                format!("Could not reach the provider service: {message}")
            }
            Self::Internal { message } => {
                format!("An internal error occurred while generating: {message}")
            }
        }
    }
}
