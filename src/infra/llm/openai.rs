use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{LlmError, ProviderKind};

use super::LlmProvider;
use super::endpoint::{HttpEndpoint, map_transport_error};
use super::provider::{Completion, validate_prompt};
use super::response_parsing::{non_empty_owned, truncate_message};
use super::token_estimate::TokenCounter;

const KIND: ProviderKind = ProviderKind::OpenAi;

/// OpenAI chat-completions backend.
///
/// Built with [`OpenAiProvider::new`] it answers offline with a canned reply;
/// built from an [`HttpEndpoint`] it calls `/v1/chat/completions`.
#[derive(Debug, Default)]
pub struct OpenAiProvider {
    endpoint: Option<HttpEndpoint>,
    usage: TokenCounter,
}

impl OpenAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: HttpEndpoint) -> Result<Self, LlmError> {
        if endpoint.kind() != KIND {
            return Err(LlmError::validation(format!(
                "OpenAI provider cannot use a {} endpoint",
                endpoint.kind().label()
            )));
        }
        Ok(Self {
            endpoint: Some(endpoint),
            usage: TokenCounter::default(),
        })
    }

    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Self::with_endpoint(HttpEndpoint::new(KIND, api_key, api_base_url, timeout)?)
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::with_endpoint(HttpEndpoint::from_env(KIND)?)
    }

    pub fn is_live(&self) -> bool {
        self.endpoint.is_some()
    }

    fn request_completion(
        endpoint: &HttpEndpoint,
        prompt: &str,
        model: &str,
    ) -> Result<Completion, LlmError> {
        let payload = build_request_payload(prompt, model);
        let started = Instant::now();

        let response = endpoint
            .client()
            .post(endpoint.v1_url("chat/completions"))
            .bearer_auth(endpoint.api_key())
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(|err| map_transport_error(KIND, err))?;

        let status = response.status();
        let response_body = response
            .text()
            .map_err(|err| map_transport_error(KIND, err))?;
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        let completion = map_success_response(&response_body)?;
        debug!(
            provider = %KIND,
            model,
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            reported_tokens = ?completion.reported_tokens,
            "chat completion received"
        );
        Ok(completion)
    }
}

impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    fn generate(&mut self, prompt: &str, model: &str) -> Result<String, LlmError> {
        validate_prompt(prompt)?;

        let completion = match &self.endpoint {
            Some(endpoint) => Self::request_completion(endpoint, prompt, model)?,
            None => Completion::canned(KIND, prompt),
        };
        self.usage.record(completion.tokens_for(prompt));
        Ok(completion.text)
    }

    fn token_usage(&self) -> u64 {
        self.usage.total()
    }
}

fn build_request_payload(prompt: &str, model: &str) -> OpenAiChatCompletionsRequest {
    OpenAiChatCompletionsRequest {
        model: model.to_string(),
        messages: vec![OpenAiChatMessageRequest {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
    }
}

fn map_success_response(response_body: &str) -> Result<Completion, LlmError> {
    let response: OpenAiChatCompletionsResponse =
        serde_json::from_str(response_body).map_err(|err| {
            LlmError::invalid_response(format!("OpenAI response decode failed: {err}"))
        })?;

    let text = response
        .choices
        .iter()
        .find_map(OpenAiChoice::extract_text)
        .ok_or_else(|| {
            LlmError::invalid_response("OpenAI response did not include text content")
        })?;

    Ok(Completion {
        text,
        reported_tokens: response.usage.and_then(total_tokens),
    })
}

#[derive(Debug, Serialize)]
struct OpenAiChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiChatMessageRequest>,
}

#[derive(Debug, Serialize)]
struct OpenAiChatMessageRequest {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

impl OpenAiChoice {
    fn extract_text(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().and_then(non_empty_owned) {
            return Some(text);
        }

        let content = self.message.as_ref()?.content.as_ref()?;
        extract_message_content(content)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    #[serde(default)]
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn total_tokens(usage: OpenAiUsage) -> Option<u64> {
    usage.total_tokens.or_else(|| {
        let (Some(prompt_tokens), Some(completion_tokens)) =
            (usage.prompt_tokens, usage.completion_tokens)
        else {
            return None;
        };
        prompt_tokens.checked_add(completion_tokens)
    })
}

fn extract_message_content(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => non_empty_owned(text),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(extract_content_part_text)
                .collect::<String>();
            non_empty_owned(&joined)
        }
        _ => None,
    }
}

fn extract_content_part_text(part: &Value) -> Option<String> {
    match part {
        Value::String(text) => Some(text.to_string()),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let parsed_error = serde_json::from_str::<OpenAiErrorEnvelope>(body).ok();
    let detail = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref());
    let error_type = detail.and_then(|detail| detail.error_type.as_deref());
    let error_code = detail.and_then(|detail| detail.code.as_deref());

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(error_type, Some("authentication_error"))
        || matches!(
            error_code,
            Some("invalid_api_key" | "invalid_authentication")
        )
    {
        return LlmError::Auth;
    }

    // OpenAI reports exhausted billing as a 429 too, so check it first.
    if matches!(error_type, Some("insufficient_quota"))
        || matches!(error_code, Some("insufficient_quota"))
    {
        return LlmError::QuotaExceeded;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || matches!(error_type, Some("rate_limit_error"))
        || matches!(error_code, Some("rate_limit_exceeded"))
    {
        return LlmError::RateLimited;
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || matches!(error_type, Some("timeout" | "server_timeout"))
        || matches!(error_code, Some("request_timeout"))
    {
        return LlmError::Timeout;
    }

    let message = detail
        .map(|detail| detail.message.clone())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    LlmError::transport(format!("OpenAI API returned HTTP {status}: {message}"))
}
