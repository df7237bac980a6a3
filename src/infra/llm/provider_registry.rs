use tracing::{debug, warn};

use crate::domain::{LlmError, ProviderKind};

use super::env::BackendMode;
use super::{AnthropicProvider, HttpEndpoint, LlmProvider, OpenAiProvider};

/// Builds a fresh provider per request from a case-insensitive identifier.
///
/// The registry holds no provider instances. Each call to
/// [`ProviderRegistry::create_provider`] returns a new provider whose token
/// counter starts at zero. Kinds without a configured endpoint answer offline.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    openai: Option<HttpEndpoint>,
    anthropic: Option<HttpEndpoint>,
}

impl ProviderRegistry {
    /// Registry where every kind uses its canned backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned unless `FACULTY_LLM_BACKEND=live`. In live mode every kind is
    /// configured from its environment variables and a missing API key fails
    /// here rather than on first use.
    pub fn from_env() -> Result<Self, LlmError> {
        let mode = BackendMode::from_env()?;
        let mut registry = Self::new();
        if mode == BackendMode::Live {
            for kind in ProviderKind::ALL {
                registry.set_endpoint(HttpEndpoint::from_env(kind)?);
            }
        }
        debug!(?mode, "provider registry configured");
        Ok(registry)
    }

    /// Routes the endpoint's kind to the live backend. Replaces any endpoint
    /// previously set for that kind.
    pub fn with_endpoint(mut self, endpoint: HttpEndpoint) -> Self {
        self.set_endpoint(endpoint);
        self
    }

    pub fn set_endpoint(&mut self, endpoint: HttpEndpoint) {
        match endpoint.kind() {
            ProviderKind::OpenAi => self.openai = Some(endpoint),
            ProviderKind::Anthropic => self.anthropic = Some(endpoint),
        }
    }

    pub fn is_live(&self, kind: ProviderKind) -> bool {
        self.endpoint(kind).is_some()
    }

    pub fn create_provider(&self, identifier: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
        let kind = ProviderKind::parse(identifier).inspect_err(|_| {
            warn!(identifier, "rejected unknown provider identifier");
        })?;
        self.create_provider_for(kind)
    }

    pub fn create_provider_for(
        &self,
        kind: ProviderKind,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        let endpoint = self.endpoint(kind).cloned();
        debug!(provider = %kind, live = endpoint.is_some(), "creating provider");

        Ok(match (kind, endpoint) {
            (ProviderKind::OpenAi, None) => Box::new(OpenAiProvider::new()),
            (ProviderKind::OpenAi, Some(endpoint)) => {
                Box::new(OpenAiProvider::with_endpoint(endpoint)?)
            }
            (ProviderKind::Anthropic, None) => Box::new(AnthropicProvider::new()),
            (ProviderKind::Anthropic, Some(endpoint)) => {
                Box::new(AnthropicProvider::with_endpoint(endpoint)?)
            }
        })
    }

    /// Live endpoint configured for `kind`, if any.
    pub fn endpoint(&self, kind: ProviderKind) -> Option<&HttpEndpoint> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
        }
    }
}

/// Shorthand for [`ProviderRegistry::new`] followed by
/// [`ProviderRegistry::create_provider`].
pub fn create_provider(identifier: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
    ProviderRegistry::new().create_provider(identifier)
}
