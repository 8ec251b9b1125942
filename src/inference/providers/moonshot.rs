//! Moonshot AI (Kimi) provider over the OpenAI-compatible chat completions API.
//!
//! Models: `moonshot-v1-8k`, `moonshot-v1-32k`, `moonshot-v1-128k`.
//! Moonshot recommends temperature 0.6 for Kimi K2 Instruct.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::config::ProviderConfig;
use crate::inference::{
    CompletionOptions, CompletionProvider, CompletionStream, ContextLength, Message, ModelInfo,
    ProviderError, ToolCall, ToolChoice, ToolCompletion, ToolDefinition, ToolRequest,
};

pub const PROVIDER_LABEL: &str = "Moonshot AI";
pub const MAX_OUTPUT_TOKENS: u32 = 8192;
pub const RECOMMENDED_TEMPERATURE: f64 = 0.6;

const PROBE_MAX_TOKENS: u32 = 5;

/// Context window by model name.
fn context_length(model: &str) -> ContextLength {
    match model {
        "moonshot-v1-8k" => ContextLength::Known(8192),
        "moonshot-v1-32k" => ContextLength::Known(32768),
        "moonshot-v1-128k" => ContextLength::Known(131072),
        _ => ContextLength::Unknown,
    }
}

// ============================================================================
// Chat Completions API Types
// ============================================================================

/// The request body for `/chat/completions`
#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    // Older API versions omit the field entirely; treated the same as "no calls".
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Serializes the typed request and merges caller extras underneath it.
/// Fields set by the provider always win over extras with the same key.
fn build_body(
    request: &ChatCompletionRequest<'_>,
    extra: &serde_json::Map<String, serde_json::Value>,
) -> Result<serde_json::Value, ProviderError> {
    let mut body = serde_json::to_value(request)
        .map_err(|e| ProviderError::Parse(format!("request serialization failed: {e}")))?;
    if let Some(obj) = body.as_object_mut() {
        for (key, value) in extra {
            if obj.contains_key(key) {
                debug!("Ignoring extra parameter '{}': set by provider", key);
                continue;
            }
            obj.insert(key.clone(), value.clone());
        }
    }
    Ok(body)
}

fn require_messages(messages: &[Message]) -> Result<(), ProviderError> {
    if messages.is_empty() {
        return Err(ProviderError::InvalidRequest(
            "at least one message is required".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// HTTP client bound to one key and base URL.
struct ApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    /// POSTs to `/chat/completions` and returns the successful response.
    async fn post(
        &self,
        body: &serde_json::Value,
        options: &CompletionOptions,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("POST {}", url);

        let mut builder = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!("Moonshot response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Moonshot API error: {} - {}", status, err_body);
            return Err(ProviderError::Api {
                status,
                message: err_body,
            });
        }

        Ok(response)
    }

    /// Sends a non-streaming request and decodes the first choice.
    async fn first_message(
        &self,
        body: &serde_json::Value,
        options: &CompletionOptions,
    ) -> Result<ResponseMessage, ProviderError> {
        let response = self.post(body, options).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ProviderError::Parse("response contained no choices".to_string()))
    }
}

/// Moonshot AI provider. Requests fail with `NotInitialized` when no API key
/// was resolved.
pub struct MoonshotProvider {
    config: ProviderConfig,
    client: Option<ApiClient>,
}

impl MoonshotProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = match config.api_key() {
            Some(key) => {
                info!("Initialized MoonshotProvider with model: {}", config.model_name());
                Some(ApiClient {
                    http: reqwest::Client::new(),
                    api_key: key.to_string(),
                    base_url: config.base_url().to_string(),
                })
            }
            None => {
                warn!(
                    "MoonshotProvider initialized without API key. Set MOONSHOT_API_KEY \
                     or pass an explicit key."
                );
                None
            }
        };
        Self { config, client }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&ApiClient, ProviderError> {
        self.client.as_ref().ok_or(ProviderError::NotInitialized)
    }

    fn temperature(&self, options: &CompletionOptions) -> f64 {
        options.temperature.unwrap_or(self.config.temperature())
    }

    fn max_tokens(&self, options: &CompletionOptions) -> u32 {
        options.max_tokens.unwrap_or(self.config.max_tokens())
    }
}

#[async_trait]
impl CompletionProvider for MoonshotProvider {
    fn name(&self) -> &str {
        "moonshot"
    }

    async fn chat_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let client = self.client()?;
        require_messages(messages)?;

        debug!("Requesting chat completion with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: self.config.model_name(),
            messages,
            temperature: Some(self.temperature(options)),
            max_tokens: Some(self.max_tokens(options)),
            tools: None,
            tool_choice: None,
            stream: None,
        };
        let body = build_body(&request, &options.extra)?;
        let message = client.first_message(&body, options).await?;

        Ok(message.content.unwrap_or_else(|| {
            warn!("Chat completion returned no content");
            String::new()
        }))
    }

    async fn tool_completion(
        &self,
        request: ToolRequest<'_>,
    ) -> Result<ToolCompletion, ProviderError> {
        let client = self.client()?;
        require_messages(request.messages)?;

        debug!(
            "Requesting tool completion with {} messages and {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let api_request = ChatCompletionRequest {
            model: self.config.model_name(),
            messages: request.messages,
            temperature: Some(self.temperature(request.options)),
            // Only sent when the caller asks for a cap.
            max_tokens: request.options.max_tokens,
            tools: Some(request.tools),
            tool_choice: Some(&request.tool_choice),
            stream: None,
        };
        let body = build_body(&api_request, &request.options.extra)?;
        let message = client.first_message(&body, request.options).await?;

        let tool_calls = message.tool_calls.unwrap_or_default();
        debug!("Tool completion returned {} tool call(s)", tool_calls.len());

        Ok(ToolCompletion {
            content: message.content,
            tool_calls,
        })
    }

    async fn validate_credentials(&self) -> bool {
        let Ok(client) = self.client() else {
            return false;
        };

        let probe = [Message::user("test")];
        let request = ChatCompletionRequest {
            model: self.config.model_name(),
            messages: &probe,
            temperature: None,
            max_tokens: Some(PROBE_MAX_TOKENS),
            tools: None,
            tool_choice: None,
            stream: None,
        };
        let options = CompletionOptions::default();

        let result = match build_body(&request, &options.extra) {
            Ok(body) => client.first_message(&body, &options).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Credential validation failed: {}", e);
                false
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        let model = self.config.model_name();
        ModelInfo {
            provider: PROVIDER_LABEL.to_string(),
            model: model.to_string(),
            context_length: context_length(model),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            supports_tool_calling: true,
            supports_streaming: true,
            recommended_temperature: RECOMMENDED_TEMPERATURE,
            description: "Kimi K2 - Trillion-parameter LLM with 256K context support".to_string(),
        }
    }

    async fn stream_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, ProviderError> {
        let client = self.client()?;
        require_messages(messages)?;

        info!(
            "Moonshot streaming request: model={}, message_count={}",
            self.config.model_name(),
            messages.len()
        );

        let request = ChatCompletionRequest {
            model: self.config.model_name(),
            messages,
            temperature: Some(self.temperature(options)),
            max_tokens: Some(self.max_tokens(options)),
            tools: None,
            tool_choice: None,
            stream: Some(true),
        };
        let body = build_body(&request, &options.extra)?;
        let response = client.post(&body, options).await?;

        Ok(CompletionStream::from_response(response))
    }
}
