mod anthropic;
mod endpoint;
mod env;
mod openai;
mod provider;
mod provider_registry;
mod response_parsing;
pub mod token_estimate;

pub use anthropic::AnthropicProvider;
pub use endpoint::{DEFAULT_TIMEOUT, HttpEndpoint};
pub use env::BackendMode;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use provider_registry::{ProviderRegistry, create_provider};
pub use token_estimate::estimate_tokens;
