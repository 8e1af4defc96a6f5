#![deny(unsafe_code)]

//! AI text-generation backends.
//!
//! One `generate` entry point fanned out over the provider HTTP APIs the
//! job worker is configured with. Adapters are stateless: callers own the
//! `reqwest::Client` and the backend configuration.

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const ERROR_BODY_LIMIT: usize = 320;

/// Supported generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiBackendKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl std::fmt::Display for AiBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        })
    }
}

/// One configured backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBackendConfig {
    pub kind: AiBackendKind,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the provider endpoint; defaults per provider.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl AiBackendConfig {
    /// A backend without credentials cannot serve requests.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Short `provider/model` label for logs.
    pub fn label(&self) -> String {
        format!("{}/{}", self.kind, self.model)
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Token accounting reported by a provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub backend: AiBackendKind,
    pub model: String,
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub latency_ms: u64,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{kind} backend is not configured (missing api_key)")]
    NotConfigured { kind: AiBackendKind },

    #[error("{kind} request failed: {source}")]
    Request {
        kind: AiBackendKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{kind} error {status}: {body}")]
    Upstream {
        kind: AiBackendKind,
        status: u16,
        body: String,
    },

    #[error("invalid {kind} response: {reason}")]
    InvalidResponse { kind: AiBackendKind, reason: String },
}

/// HTTP client the worker shares across generation calls.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(60)).build()
}

/// Run one generation against `backend`.
pub async fn generate(
    client: &Client,
    backend: &AiBackendConfig,
    request: &GenerationRequest,
) -> Result<Generation, AdapterError> {
    if !backend.is_configured() {
        return Err(AdapterError::NotConfigured { kind: backend.kind });
    }

    let started = Instant::now();
    let (text, finish_reason, usage) = match backend.kind {
        AiBackendKind::OpenAi => generate_openai(client, backend, request).await?,
        AiBackendKind::Anthropic => generate_anthropic(client, backend, request).await?,
        AiBackendKind::Gemini => generate_gemini(client, backend, request).await?,
    };

    Ok(Generation {
        backend: backend.kind,
        model: backend.model.clone(),
        text,
        finish_reason,
        usage,
        latency_ms: started.elapsed().as_millis().min(u64::MAX as u128) as u64,
    })
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

async fn generate_openai(
    client: &Client,
    backend: &AiBackendConfig,
    request: &GenerationRequest,
) -> Result<(String, Option<String>, Option<TokenUsage>), AdapterError> {
    let kind = backend.kind;
    let api_key = backend.api_key.as_deref().unwrap_or_default();
    let url = resolve_chat_endpoint(backend.endpoint.as_deref(), DEFAULT_OPENAI_ENDPOINT);

    let mut messages = Vec::new();
    if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut payload = json!({
        "model": backend.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens.or(backend.max_tokens) {
        payload["max_tokens"] = json!(max_tokens);
    }

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|source| AdapterError::Request { kind, source })?;
    let body: OpenAiResponse = read_json(kind, response).await?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdapterError::InvalidResponse {
            kind,
            reason: "response did not include choices".into(),
        })?;

    let usage = body.usage.map(|usage| TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    });

    Ok((
        extract_text(&choice.message.content),
        choice.finish_reason,
        usage,
    ))
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

async fn generate_anthropic(
    client: &Client,
    backend: &AiBackendConfig,
    request: &GenerationRequest,
) -> Result<(String, Option<String>, Option<TokenUsage>), AdapterError> {
    let kind = backend.kind;
    let api_key = backend.api_key.as_deref().unwrap_or_default();
    let url = resolve_messages_endpoint(backend.endpoint.as_deref(), DEFAULT_ANTHROPIC_ENDPOINT);

    let mut payload = json!({
        "model": backend.model,
        "max_tokens": request.max_tokens.or(backend.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": [
            { "role": "user", "content": request.prompt }
        ],
    });
    if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
        payload["system"] = json!(system);
    }

    let response = client
        .post(&url)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&payload)
        .send()
        .await
        .map_err(|source| AdapterError::Request { kind, source })?;
    let body: AnthropicResponse = read_json(kind, response).await?;

    let text = body
        .content
        .iter()
        .filter(|part| part.content_type == "text")
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    let usage = body.usage.map(|usage| TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    });

    Ok((text, body.stop_reason, usage))
}

async fn generate_gemini(
    client: &Client,
    backend: &AiBackendConfig,
    request: &GenerationRequest,
) -> Result<(String, Option<String>, Option<TokenUsage>), AdapterError> {
    let kind = backend.kind;
    let api_key = backend.api_key.as_deref().unwrap_or_default();
    let url = resolve_gemini_endpoint(backend.endpoint.as_deref(), &backend.model, api_key)
        .map_err(|reason| AdapterError::InvalidResponse { kind, reason })?;

    let mut payload = json!({
        "contents": [
            { "parts": [ { "text": request.prompt } ] }
        ]
    });
    if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
        payload["systemInstruction"] = json!({ "parts": [ { "text": system } ] });
    }
    if let Some(max_tokens) = request.max_tokens.or(backend.max_tokens) {
        payload["generationConfig"] = json!({ "maxOutputTokens": max_tokens });
    }

    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|source| AdapterError::Request { kind, source })?;
    let body: Value = read_json(kind, response).await?;

    let candidate = body["candidates"].as_array().and_then(|c| c.first());
    let text = candidate
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
        .trim()
        .to_string();
    let finish_reason = candidate
        .and_then(|candidate| candidate["finishReason"].as_str())
        .map(str::to_string);

    let usage = body["usageMetadata"].as_object().map(|usage| TokenUsage {
        input_tokens: usage.get("promptTokenCount").and_then(Value::as_u64),
        output_tokens: usage.get("candidatesTokenCount").and_then(Value::as_u64),
    });

    Ok((text, finish_reason, usage))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    kind: AiBackendKind,
    response: reqwest::Response,
) -> Result<T, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Upstream {
            kind,
            status: status.as_u16(),
            body: truncate(&body, ERROR_BODY_LIMIT),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AdapterError::InvalidResponse {
            kind,
            reason: e.to_string(),
        })
}

fn resolve_chat_endpoint(endpoint: Option<&str>, default_endpoint: &str) -> String {
    let endpoint = endpoint.unwrap_or(default_endpoint);
    if endpoint.contains("/chat/completions") {
        endpoint.to_string()
    } else {
        format!("{}/chat/completions", endpoint.trim_end_matches('/'))
    }
}

fn resolve_messages_endpoint(endpoint: Option<&str>, default_endpoint: &str) -> String {
    let endpoint = endpoint.unwrap_or(default_endpoint);
    if endpoint.ends_with("/messages") {
        endpoint.to_string()
    } else {
        format!("{}/messages", endpoint.trim_end_matches('/'))
    }
}

fn resolve_gemini_endpoint(
    endpoint: Option<&str>,
    model: &str,
    api_key: &str,
) -> Result<Url, String> {
    let endpoint = endpoint.unwrap_or(DEFAULT_GEMINI_ENDPOINT);
    let mut url = if endpoint.contains(":generateContent") {
        Url::parse(endpoint).map_err(|e| format!("invalid endpoint {}: {}", endpoint, e))?
    } else {
        let generated = format!(
            "{}/v1beta/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        );
        Url::parse(&generated).map_err(|e| format!("invalid endpoint {}: {}", generated, e))?
    };

    if !url.query_pairs().any(|(k, _)| k == "key") {
        url.query_pairs_mut().append_pair("key", api_key);
    }

    Ok(url)
}

fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(kind: AiBackendKind, api_key: Option<&str>) -> AiBackendConfig {
        AiBackendConfig {
            kind,
            model: "test-model".into(),
            api_key: api_key.map(str::to_string),
            endpoint: None,
            max_tokens: None,
        }
    }

    #[test]
    fn backend_without_key_is_not_configured() {
        assert!(!backend(AiBackendKind::OpenAi, None).is_configured());
        assert!(!backend(AiBackendKind::OpenAi, Some("")).is_configured());
        assert!(backend(AiBackendKind::OpenAi, Some("sk-test")).is_configured());
    }

    #[tokio::test]
    async fn generate_refuses_unconfigured_backend() {
        let client = http_client().unwrap();
        let err = generate(
            &client,
            &backend(AiBackendKind::Anthropic, None),
            &GenerationRequest::new("What is 2 + 2?"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdapterError::NotConfigured { .. }));
    }

    #[test]
    fn chat_endpoint_resolution_appends_path_once() {
        assert_eq!(
            resolve_chat_endpoint(None, DEFAULT_OPENAI_ENDPOINT),
            DEFAULT_OPENAI_ENDPOINT
        );
        assert_eq!(
            resolve_chat_endpoint(Some("https://proxy.local"), DEFAULT_OPENAI_ENDPOINT),
            "https://proxy.local/chat/completions"
        );
    }

    #[test]
    fn gemini_endpoint_carries_model_and_key() {
        let url = resolve_gemini_endpoint(None, "gemini-2.5-flash", "k").unwrap();
        assert!(url.path().contains("gemini-2.5-flash"));
        assert!(url.query_pairs().any(|(k, v)| k == "key" && v == "k"));
    }

    #[test]
    fn openai_content_extraction_handles_parts() {
        let parts = json!([{ "text": "a" }, { "text": "b" }]);
        assert_eq!(extract_text(&parts), "a\nb");
        assert_eq!(extract_text(&json!("plain")), "plain");
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AiBackendKind::OpenAi).unwrap(),
            "\"openai\""
        );
    }
}
