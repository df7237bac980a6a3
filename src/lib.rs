//! Provider abstraction and usage accounting for the faculty portal's LLM
//! modules.
//!
//! - [`infra::llm`] turns a provider identifier into a fresh, request-scoped
//!   [`LlmProvider`](infra::llm::LlmProvider) with its own token counter.
//! - [`app`] runs stored prompt templates through a provider and keeps the
//!   append-only usage log and its analytics.

pub mod app;
pub mod domain;
pub mod infra;
