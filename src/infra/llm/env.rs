use std::time::Duration;

use crate::domain::LlmError;

pub(crate) const ENV_BACKEND: &str = "FACULTY_LLM_BACKEND";
pub(crate) const ENV_GLOBAL_TIMEOUT_SECS: &str = "FACULTY_LLM_TIMEOUT_SECS";

pub(crate) fn read_env_var(name: &str) -> Result<Option<String>, LlmError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(LlmError::validation(format!(
            "{name} could not be read: {error}"
        ))),
    }
}

/// First variable that is set and non-blank.
pub(crate) fn read_first_env_var(names: &[&str]) -> Result<Option<String>, LlmError> {
    for name in names {
        if let Some(value) = read_env_var(name)?
            && !value.trim().is_empty()
        {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, LlmError> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        LlmError::validation(format!("{name} must be a positive integer in seconds"))
    })?;
    if parsed == 0 {
        return Err(LlmError::validation(format!(
            "{name} must be greater than 0 seconds"
        )));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout_from_env(name: &str) -> Result<Option<Duration>, LlmError> {
    let Some(value) = read_env_var(name)? else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

pub(crate) fn resolve_timeout_with_global_fallback<F>(
    provider_timeout: Option<Duration>,
    read_global_timeout: F,
    default_timeout: Duration,
) -> Result<Duration, LlmError>
where
    F: FnOnce() -> Result<Option<Duration>, LlmError>,
{
    if let Some(timeout) = provider_timeout {
        return Ok(timeout);
    }

    Ok(read_global_timeout()?.unwrap_or(default_timeout))
}

/// Whether provider calls go over the network or use the offline canned reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    #[default]
    Canned,
    Live,
}

impl BackendMode {
    pub(crate) fn parse(name: &str, value: &str) -> Result<Self, LlmError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("canned") || value.is_empty() {
            Ok(Self::Canned)
        } else if value.eq_ignore_ascii_case("live") {
            Ok(Self::Live)
        } else {
            Err(LlmError::validation(format!(
                "{name} must be 'canned' or 'live' (got '{value}')"
            )))
        }
    }

    pub(crate) fn from_env() -> Result<Self, LlmError> {
        match read_env_var(ENV_BACKEND)? {
            Some(value) => Self::parse(ENV_BACKEND, &value),
            None => Ok(Self::default()),
        }
    }
}
