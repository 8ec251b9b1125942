//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::inference::{
    CompletionOptions, CompletionProvider, CompletionStream, ContextLength, Message, ModelInfo,
    ProviderError, ToolCompletion, ToolRequest,
};

/// A chat call as the provider saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// A provider that replies from a fixed script and records what it was sent.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails with a network error.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, messages: &[Message], options: &CompletionOptions) {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            options: options.clone(),
        });
    }

    fn next_reply(&self) -> Result<String, ProviderError> {
        if self.fail {
            return Err(ProviderError::Network("connection refused".to_string()));
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Parse("script exhausted".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.record(messages, options);
        self.next_reply()
    }

    async fn tool_completion(
        &self,
        request: ToolRequest<'_>,
    ) -> Result<ToolCompletion, ProviderError> {
        self.record(request.messages, request.options);
        Ok(ToolCompletion {
            content: Some(self.next_reply()?),
            tool_calls: Vec::new(),
        })
    }

    async fn validate_credentials(&self) -> bool {
        !self.fail
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "Scripted".to_string(),
            model: "test-model".to_string(),
            context_length: ContextLength::Unknown,
            max_output_tokens: 0,
            supports_tool_calling: false,
            supports_streaming: true,
            recommended_temperature: 0.6,
            description: String::new(),
        }
    }

    async fn stream_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, ProviderError> {
        self.record(messages, options);
        let reply = self.next_reply()?;
        let line = serde_json::json!({ "choices": [{ "delta": { "content": reply } }] });
        let body = format!("data: {line}\n\ndata: [DONE]\n");
        Ok(CompletionStream::new(stream::iter(vec![Ok::<_, ProviderError>(body.into_bytes())])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_completion_delegates_to_chat() {
        let provider = ScriptedProvider::replying(&["ok"]);
        let reply = provider
            .completion("P", Some("S"), &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(
            provider.calls()[0].messages,
            vec![Message::system("S"), Message::user("P")]
        );
    }

    #[tokio::test]
    async fn test_scripted_stream_round_trips_reply() {
        let provider = ScriptedProvider::replying(&["streamed text"]);
        let stream = provider
            .stream_completion(&[Message::user("go")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.collect_text().await.unwrap(), "streamed text");
    }

    #[test]
    fn test_failing_provider_reports_network_error() {
        let provider = ScriptedProvider::failing();
        let result = tokio_test::block_on(
            provider.chat_completion(&[Message::user("hi")], &CompletionOptions::default()),
        );
        assert!(matches!(result, Err(ProviderError::Network(_))));
        assert!(!tokio_test::block_on(provider.validate_credentials()));
    }
}
