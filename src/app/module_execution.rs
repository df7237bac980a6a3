use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::domain::{LlmError, UsageRecord};
use crate::infra::llm::{LlmProvider, ProviderRegistry};

use super::{ModuleCatalog, UsageLog};

pub const DEFAULT_PROVIDER: &str = "openai";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    /// Single attempt.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.max_attempts == 0 {
            return Err(LlmError::validation(
                "retry max_attempts must be greater than 0",
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(LlmError::validation(
                "retry max_backoff must be greater than or equal to initial_backoff",
            ));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based): doubles from
    /// `initial_backoff`, capped at `max_backoff`.
    fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteModuleCommand {
    pub user_id: String,
    pub module_id: String,
    pub user_input: String,
    /// Provider identifier; [`DEFAULT_PROVIDER`] when absent.
    #[serde(default)]
    pub provider: Option<String>,
}

impl ExecuteModuleCommand {
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.user_id.trim().is_empty() {
            return Err(LlmError::validation("user_id must not be empty"));
        }
        if self.module_id.trim().is_empty() {
            return Err(LlmError::validation("module_id must not be empty"));
        }
        if self.user_input.is_empty() {
            return Err(LlmError::validation("user_input must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub response: String,
    pub tokens_used: u64,
    pub module_name: String,
}

/// Runs a stored module against a fresh provider and appends one usage record
/// per successful run.
#[derive(Clone)]
pub struct ModuleExecutionService {
    registry: ProviderRegistry,
    catalog: Arc<dyn ModuleCatalog>,
    usage_log: Arc<dyn UsageLog>,
    retry: RetryConfig,
}

impl ModuleExecutionService {
    pub fn new(
        registry: ProviderRegistry,
        catalog: Arc<dyn ModuleCatalog>,
        usage_log: Arc<dyn UsageLog>,
    ) -> Self {
        Self {
            registry,
            catalog,
            usage_log,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(
        registry: ProviderRegistry,
        catalog: Arc<dyn ModuleCatalog>,
        usage_log: Arc<dyn UsageLog>,
        retry: RetryConfig,
    ) -> Result<Self, LlmError> {
        retry.validate()?;
        Ok(Self {
            registry,
            catalog,
            usage_log,
            retry,
        })
    }

    pub fn execute(&self, command: ExecuteModuleCommand) -> Result<ExecutionOutcome, LlmError> {
        self.execute_with_cancel(command, || false)
    }

    /// Like [`execute`](Self::execute) but stops with
    /// `Internal("generation cancelled")` once `is_cancelled` returns true.
    /// The predicate is polled before every attempt and during retry backoff.
    pub fn execute_with_cancel<F>(
        &self,
        command: ExecuteModuleCommand,
        is_cancelled: F,
    ) -> Result<ExecutionOutcome, LlmError>
    where
        F: Fn() -> bool,
    {
        command.validate()?;

        let provider_id = command.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
        let span = info_span!(
            "execute_module",
            module_id = %command.module_id,
            user_id = %command.user_id,
            provider = provider_id
        );
        let _entered = span.enter();

        let module = self
            .catalog
            .find_module(&command.module_id)?
            .ok_or_else(|| LlmError::module_not_found(command.module_id.as_str()))?;
        let prompt = module.render_prompt(&command.user_input);

        let mut provider = self.registry.create_provider(provider_id)?;
        let response =
            self.generate_with_retry(provider.as_mut(), &prompt, &module.model, &is_cancelled)?;
        let tokens_used = provider.token_usage();

        self.usage_log.append(UsageRecord {
            user_id: command.user_id,
            module_id: module.id,
            tokens_used,
            prompt: prompt.clone(),
            response: response.clone(),
            created_at: Utc::now(),
        })?;

        info!(
            model = %module.model,
            tokens_used,
            prompt_chars = prompt.chars().count(),
            response_chars = response.chars().count(),
            "module executed"
        );

        Ok(ExecutionOutcome {
            response,
            tokens_used,
            module_name: module.name,
        })
    }

    fn generate_with_retry<F>(
        &self,
        provider: &mut dyn LlmProvider,
        prompt: &str,
        model: &str,
        is_cancelled: &F,
    ) -> Result<String, LlmError>
    where
        F: Fn() -> bool,
    {
        let mut attempt = 1;
        loop {
            if is_cancelled() {
                return Err(cancelled_error());
            }

            match provider.generate(prompt, model) {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "retryable provider error"
                    );
                    sleep_unless_cancelled(backoff, is_cancelled)?;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn sleep_unless_cancelled<F>(duration: Duration, is_cancelled: &F) -> Result<(), LlmError>
where
    F: Fn() -> bool,
{
    // An unrepresentable deadline waits until cancelled.
    let deadline = Instant::now().checked_add(duration);
    loop {
        if is_cancelled() {
            return Err(cancelled_error());
        }
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        };
        if remaining.is_zero() {
            return Ok(());
        }
        thread::sleep(CANCEL_POLL_INTERVAL.min(remaining));
    }
}

fn cancelled_error() -> LlmError {
    LlmError::internal("generation cancelled")
}
