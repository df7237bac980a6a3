use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::{LlmError, ProviderKind};

use super::env::{
    ENV_GLOBAL_TIMEOUT_SECS, read_env_var, read_first_env_var, read_timeout_from_env,
    resolve_timeout_with_global_fallback,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one vendor API. Cloning shares the underlying
/// connection pool.
#[derive(Clone)]
pub struct HttpEndpoint {
    kind: ProviderKind,
    api_key: String,
    api_base_url: String,
    timeout: Duration,
    client: Client,
}

impl std::fmt::Debug for HttpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEndpoint")
            .field("kind", &self.kind)
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpEndpoint {
    pub fn new(
        kind: ProviderKind,
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let label = kind.label();

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::validation(format!(
                "{label} API key must not be empty"
            )));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(LlmError::validation(format!(
                "{label} API base URL must not be empty"
            )));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            LlmError::internal(format!("failed to create {label} HTTP client: {err}"))
        })?;

        Ok(Self {
            kind,
            api_key,
            api_base_url,
            timeout,
            client,
        })
    }

    /// Reads `FACULTY_LLM_<VENDOR>_API_KEY` (or the vendor's conventional
    /// variable), `_BASE_URL` and `_TIMEOUT_SECS`, falling back to the global
    /// timeout and then [`DEFAULT_TIMEOUT`].
    pub fn from_env(kind: ProviderKind) -> Result<Self, LlmError> {
        let vars = EnvNames::for_kind(kind);

        let api_key = read_first_env_var(&[vars.api_key, vars.api_key_fallback])?.ok_or_else(
            || {
                LlmError::validation(format!(
                    "{} API key is missing (set {} or {})",
                    kind.label(),
                    vars.api_key,
                    vars.api_key_fallback
                ))
            },
        )?;
        let api_base_url =
            read_env_var(vars.base_url)?.unwrap_or_else(|| vars.default_base_url.to_string());
        let provider_timeout = read_timeout_from_env(vars.timeout_secs)?;
        let timeout = resolve_timeout_with_global_fallback(
            provider_timeout,
            || read_timeout_from_env(ENV_GLOBAL_TIMEOUT_SECS),
            DEFAULT_TIMEOUT,
        )?;

        Self::new(kind, api_key, api_base_url, timeout)
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn v1_url(&self, path: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{base}/v1/{}", path.trim_start_matches('/'))
    }
}

struct EnvNames {
    api_key: &'static str,
    api_key_fallback: &'static str,
    base_url: &'static str,
    timeout_secs: &'static str,
    default_base_url: &'static str,
}

impl EnvNames {
    fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAi => Self {
                api_key: "FACULTY_LLM_OPENAI_API_KEY",
                api_key_fallback: "OPENAI_API_KEY",
                base_url: "FACULTY_LLM_OPENAI_BASE_URL",
                timeout_secs: "FACULTY_LLM_OPENAI_TIMEOUT_SECS",
                default_base_url: "https://api.openai.com",
            },
            ProviderKind::Anthropic => Self {
                api_key: "FACULTY_LLM_ANTHROPIC_API_KEY",
                api_key_fallback: "ANTHROPIC_API_KEY",
                base_url: "FACULTY_LLM_ANTHROPIC_BASE_URL",
                timeout_secs: "FACULTY_LLM_ANTHROPIC_TIMEOUT_SECS",
                default_base_url: "https://api.anthropic.com",
            },
        }
    }
}

pub(crate) fn map_transport_error(kind: ProviderKind, error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout;
    }
    LlmError::transport(format!("{} transport error: {error}", kind.label()))
}
