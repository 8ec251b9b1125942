use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Speaker of a message (OpenAI terminology).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation. Order within a conversation is turn order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Per-call sampling options.
///
/// Unset fields fall back to the provider's configured defaults. `extra`
/// carries provider-specific request fields (e.g. `top_p`, `stop`); it never
/// overrides a field the provider sets itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Per-request transport timeout.
    pub timeout: Option<Duration>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A tool the model may ask the caller to run. Passed through to the API as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value, // JSON Schema
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Builds a definition whose parameter schema is derived from `T`.
    pub fn for_args<T: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let schema = schemars::schema_for!(T);
        let mut parameters = serde_json::to_value(schema).unwrap_or_default();
        // The API wants a bare object schema, not a draft document.
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Self::new(name, description, parameters)
    }
}

/// Serializes in the chat-completions `tools` shape:
/// `{"type":"function","function":{"name":..,"description":..,"parameters":..}}`.
impl Serialize for ToolDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Function<'a> {
            name: &'a str,
            description: &'a str,
            parameters: &'a serde_json::Value,
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry(
            "function",
            &Function {
                name: &self.name,
                description: &self.description,
                parameters: &self.parameters,
            },
        )?;
        map.end()
    }
}

/// How the model may use the supplied tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides (default)
    #[default]
    Auto,
    /// Model must call at least one tool
    Required,
    /// Model must call the named function
    Function(String),
}

impl ToolChoice {
    /// `"auto"` and `"required"` map to their variants; anything else names a function.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "auto" => ToolChoice::Auto,
            "required" => ToolChoice::Required,
            name => ToolChoice::Function(name.to_string()),
        }
    }
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::Function(name) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "function")?;
                map.serialize_entry("function", &serde_json::json!({ "name": name }))?;
                map.end()
            }
        }
    }
}

/// Function name and raw JSON arguments of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String, // JSON string, not validated
}

/// A tool invocation requested by the model. Never executed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Result of a tool-enabled completion: free text plus zero or more tool calls.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ToolCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ToolCompletion {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Context window size, when the model is in the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLength {
    Known(u32),
    Unknown,
}

impl fmt::Display for ContextLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextLength::Known(tokens) => write!(f, "{tokens}"),
            ContextLength::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for ContextLength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContextLength::Known(tokens) => serializer.serialize_u32(*tokens),
            ContextLength::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

/// Static metadata about the configured model. No network involved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub context_length: ContextLength,
    pub max_output_tokens: u32,
    pub supports_tool_calling: bool,
    pub supports_streaming: bool,
    pub recommended_temperature: f64,
    pub description: String,
}
