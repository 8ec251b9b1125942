use std::fmt;

use async_trait::async_trait;

use super::stream::CompletionStream;
use super::types::{CompletionOptions, Message, ModelInfo, ToolChoice, ToolCompletion, ToolDefinition};
use crate::ProviderKind;

/// Errors that can occur during provider operations.
/// Nothing here is retried; variants only tell the caller what went wrong.
#[derive(Debug)]
pub enum ProviderError {
    /// No API key was resolved, so no client exists. Raised before any I/O.
    NotInitialized,
    /// The call itself is malformed (e.g. an empty conversation). Raised before any I/O.
    InvalidRequest(String),
    /// The provider kind has no implementation.
    Unsupported(ProviderKind),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// API returned an error response.
    Api { status: u16, message: String },
    /// Failed to parse the provider's response.
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotInitialized => {
                write!(f, "client not initialized: provide an API key")
            }
            ProviderError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            ProviderError::Unsupported(kind) => {
                write!(f, "provider '{kind}' is not implemented")
            }
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ProviderError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// True for errors raised locally before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ProviderError::NotInitialized
                | ProviderError::InvalidRequest(_)
                | ProviderError::Unsupported(_)
        )
    }
}

/// Everything a provider needs for a tool-enabled completion.
pub struct ToolRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub tool_choice: ToolChoice,
    pub options: &'a CompletionOptions,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Single-prompt completion, optionally under a system prompt.
    ///
    /// Same request, same result as `chat_completion` with
    /// `[system, user]` (or just `[user]` when there is no system prompt).
    async fn completion(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let messages = prompt_messages(prompt, system_prompt);
        self.chat_completion(&messages, options).await
    }

    /// Sends the conversation verbatim and returns the first choice's text.
    async fn chat_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;

    /// Completion with tools available. Tool calls are returned, never executed.
    async fn tool_completion(
        &self,
        request: ToolRequest<'_>,
    ) -> Result<ToolCompletion, ProviderError>;

    /// Makes one minimal request. Any failure is reported as `false`.
    async fn validate_credentials(&self) -> bool;

    /// Static metadata for the configured model.
    fn model_info(&self) -> ModelInfo;

    /// Streams the reply as text fragments in arrival order.
    async fn stream_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, ProviderError>;
}

/// Builds the `[system?, user]` conversation for a single prompt.
/// An empty system prompt is treated as absent.
pub fn prompt_messages(prompt: &str, system_prompt: Option<&str>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));
    messages
}
