pub mod provider;
pub mod providers;
pub mod stream;
pub mod types;

pub use provider::{CompletionProvider, ProviderError, ToolRequest, prompt_messages};
pub use providers::{MoonshotProvider, build_provider};
pub use stream::CompletionStream;
pub use types::{
    CompletionOptions, ContextLength, FunctionCall, Message, ModelInfo, Role, ToolCall, ToolChoice,
    ToolCompletion, ToolDefinition,
};
