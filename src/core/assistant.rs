//! # Assistant
//!
//! A conversation bound to one provider. Keeps the system prompt as the
//! first turn and appends every question/answer pair after it.
//!
//! ```text
//! history
//! ├── [0] system   (kept across clear_history)
//! ├── [1] user
//! ├── [2] assistant
//! └── ...
//! ```

use std::sync::Arc;

use log::{debug, warn};

use crate::inference::{CompletionOptions, CompletionProvider, Message, ProviderError, Role};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Kimi, an AI assistant created by Moonshot AI. \
    Provide clear, accurate answers. Be honest about uncertainty and prefer clarity over hedging.";

/// Replies are allowed to run longer than one-shot completions.
pub const ASSISTANT_MAX_TOKENS: u32 = 4096;

/// Code suggestions use a lower temperature for more deterministic output.
pub const CODE_TEMPERATURE: f64 = 0.3;

pub struct Assistant {
    provider: Arc<dyn CompletionProvider>,
    history: Vec<Message>,
    options: CompletionOptions,
}

impl Assistant {
    pub fn new(provider: Arc<dyn CompletionProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            history: vec![Message::system(system_prompt)],
            options: CompletionOptions::default().with_max_tokens(ASSISTANT_MAX_TOKENS),
        }
    }

    /// Replaces the options used for every turn.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn system_prompt(&self) -> &str {
        &self.history[0].content
    }

    /// Number of completed question/answer pairs.
    pub fn turns(&self) -> usize {
        self.history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Asks a question using the assistant's default options.
    pub async fn ask(&mut self, question: &str) -> Result<String, ProviderError> {
        let options = self.options.clone();
        self.ask_with(question, &options).await
    }

    /// Asks a question with per-turn options.
    ///
    /// On failure the question is removed again so the history never ends
    /// with an unanswered user turn.
    pub async fn ask_with(
        &mut self,
        question: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.history.push(Message::user(question));
        debug!("Assistant turn with {} messages", self.history.len());

        match self.provider.chat_completion(&self.history, options).await {
            Ok(reply) => {
                self.history.push(Message::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!("Assistant turn failed: {}", e);
                self.history.pop();
                Err(e)
            }
        }
    }

    /// Asks for code implementing `task`, at a lower temperature.
    pub async fn code_suggestion(&mut self, task: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Generate clean, well-documented code for the following task:\n\n{task}\n\n\
             Requirements:\n\
             - Include inline comments explaining the logic\n\
             - Handle errors explicitly\n\
             - Keep the code modular and reusable\n\n\
             Provide only the code without additional explanation."
        );
        let options = self.options.clone().with_temperature(CODE_TEMPERATURE);
        self.ask_with(&prompt, &options).await
    }

    /// Drops every turn except the system prompt.
    pub fn clear_history(&mut self) {
        self.history.truncate(1);
    }
}
