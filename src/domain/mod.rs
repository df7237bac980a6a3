mod errors;
mod generation;
mod llm_module;
mod provider_kind;
mod usage_record;

pub use errors::{LlmError, LlmErrorCategory};
pub use generation::GenerationOutput;
pub use llm_module::{INPUT_PLACEHOLDER, LlmModule, NewLlmModule};
pub use provider_kind::ProviderKind;
pub use usage_record::UsageRecord;
