use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{LlmError, ProviderKind};

use super::LlmProvider;
use super::endpoint::{HttpEndpoint, map_transport_error};
use super::provider::{Completion, validate_prompt};
use super::response_parsing::truncate_message;
use super::token_estimate::TokenCounter;

const KIND: ProviderKind = ProviderKind::Anthropic;
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic messages backend. Offline canned reply unless built from an
/// [`HttpEndpoint`].
#[derive(Debug, Default)]
pub struct AnthropicProvider {
    endpoint: Option<HttpEndpoint>,
    usage: TokenCounter,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: HttpEndpoint) -> Result<Self, LlmError> {
        if endpoint.kind() != KIND {
            return Err(LlmError::validation(format!(
                "Anthropic provider cannot use a {} endpoint",
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
            .post(endpoint.v1_url("messages"))
            .header("x-api-key", endpoint.api_key())
            .header("anthropic-version", API_VERSION)
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
            "message received"
        );
        Ok(completion)
    }
}

impl LlmProvider for AnthropicProvider {
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

fn build_request_payload(prompt: &str, model: &str) -> AnthropicMessagesRequest {
    AnthropicMessagesRequest {
        model: model.to_string(),
        max_tokens: DEFAULT_MAX_TOKENS,
        messages: vec![AnthropicMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
    }
}

fn map_success_response(response_body: &str) -> Result<Completion, LlmError> {
    let response: AnthropicMessagesResponse =
        serde_json::from_str(response_body).map_err(|err| {
            LlmError::invalid_response(format!("Anthropic response decode failed: {err}"))
        })?;

    // Text may be split across several blocks.
    let text = response
        .content
        .iter()
        .filter_map(AnthropicContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(LlmError::invalid_response(
            "Anthropic response did not include a text content block",
        ));
    }

    Ok(Completion {
        text,
        reported_tokens: response.usage.and_then(total_tokens),
    })
}

#[derive(Debug, Serialize)]
struct AnthropicMessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessagesResponse {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl AnthropicContentBlock {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

fn total_tokens(usage: AnthropicUsage) -> Option<u64> {
    match (usage.input_tokens, usage.output_tokens) {
        (Some(input), Some(output)) => input.checked_add(output),
        (Some(tokens), None) | (None, Some(tokens)) => Some(tokens),
        (None, None) => None,
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    #[serde(default)]
    error: Option<AnthropicErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let parsed_error = serde_json::from_str::<AnthropicErrorEnvelope>(body).ok();
    let detail = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref());
    let error_type = detail.map(|detail| detail.error_type.as_str());

    if matches!(
        error_type,
        Some("authentication_error" | "permission_error")
    ) || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return LlmError::Auth;
    }
    if matches!(error_type, Some("rate_limit_error")) || status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::RateLimited;
    }
    if matches!(error_type, Some("timeout_error"))
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
    {
        return LlmError::Timeout;
    }

    let message = detail
        .map(|detail| detail.message.clone())
        .unwrap_or_else(|| truncate_message(body));
    LlmError::transport(format!("Anthropic API returned HTTP {status}: {message}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{AnthropicProvider, build_request_payload, map_http_error, map_success_response};
    use crate::domain::{LlmError, ProviderKind};
    use crate::infra::llm::{HttpEndpoint, LlmProvider};

    #[test]
    fn canned_generate_labels_reply_and_accumulates_usage() {
        let mut provider = AnthropicProvider::new();

        let first = provider
            .generate("Summarize this text", "claude-3-5-sonnet")
            .expect("canned generation should succeed");
        provider
            .generate("Draft a syllabus outline", "claude-3-5-sonnet")
            .expect("canned generation should succeed");

        assert_eq!(first, "Anthropic response for: Summarize this text...");
        assert_eq!(provider.token_usage(), 4 + 6);
    }

    #[test]
    fn with_endpoint_rejects_endpoint_of_other_vendor() {
        let endpoint = HttpEndpoint::new(
            ProviderKind::OpenAi,
            "key",
            "https://api.openai.com",
            Duration::from_secs(2),
        )
        .expect("endpoint should build");

        let error = AnthropicProvider::with_endpoint(endpoint).expect_err("kind mismatch");
        assert!(matches!(
            error,
            LlmError::Validation { message }
            if message == "Anthropic provider cannot use a OpenAI endpoint"
        ));
    }

    #[test]
    fn build_request_payload_sets_max_tokens() {
        let payload = build_request_payload("Grade this essay", "claude-3-5-haiku");

        assert_eq!(payload.model, "claude-3-5-haiku");
        assert_eq!(payload.max_tokens, 1024);
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].content, "Grade this essay");
    }

    #[test]
    fn map_success_response_joins_text_blocks_and_sums_usage() {
        let completion = map_success_response(
            r#"{
              "id": "msg_01",
              "stop_reason": "end_turn",
              "usage": {"input_tokens": 110, "output_tokens": 35},
              "content": [
                {"type": "text", "text": "First half, "},
                {"type": "tool_use", "id": "tool_1", "name": "noop", "input": {}},
                {"type": "text", "text": "second half."}
              ]
            }"#,
        )
        .expect("response should map");

        assert_eq!(completion.text, "First half, second half.");
        assert_eq!(completion.reported_tokens, Some(145));
    }

    #[test]
    fn map_success_response_without_usage_leaves_estimate_to_caller() {
        let completion =
            map_success_response(r#"{"content": [{"type": "text", "text": "ok"}]}"#)
                .expect("response should map");

        assert_eq!(completion.reported_tokens, None);
        assert_eq!(completion.tokens_for("abcdefgh"), 2);
    }

    #[test]
    fn map_success_response_rejects_empty_content() {
        let error = map_success_response(r#"{"content": []}"#)
            .err()
            .expect("empty content should fail");

        assert!(matches!(error, LlmError::InvalidResponse { .. }));
    }

    #[test]
    fn map_http_error_maps_status_and_error_type() {
        let auth = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"type":"authentication_error","message":"invalid key"}}"#,
        );
        let rate_limited = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"rate_limit_error","message":"slow down"}}"#,
        );
        let timeout = map_http_error(
            StatusCode::GATEWAY_TIMEOUT,
            r#"{"error":{"type":"timeout_error","message":"timed out"}}"#,
        );
        let overloaded = map_http_error(
            StatusCode::from_u16(529).expect("529 is a valid status code"),
            r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );

        assert!(matches!(auth, LlmError::Auth));
        assert!(matches!(rate_limited, LlmError::RateLimited));
        assert!(matches!(timeout, LlmError::Timeout));
        assert!(matches!(
            overloaded,
            LlmError::Transport { message } if message.ends_with("Overloaded")
        ));
    }
}
