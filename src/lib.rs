//! Typed client for OpenAI-compatible chat completion APIs.
//!
//! Only Moonshot AI (Kimi) is wired up; the other provider kinds exist so
//! configuration can name them.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod core;
pub mod demo;
pub mod inference;

#[cfg(test)]
pub mod test_support;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Moonshot,
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// Lowercase identifier used in config files and env vars.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Moonshot => "moonshot",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Environment variable holding the API key. `None` for local providers.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::Moonshot => Some("MOONSHOT_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    pub fn base_url_env(self) -> &'static str {
        match self {
            ProviderKind::Moonshot => "MOONSHOT_BASE_URL",
            ProviderKind::OpenAi => "OPENAI_BASE_URL",
            ProviderKind::Anthropic => "ANTHROPIC_BASE_URL",
            ProviderKind::Ollama => "OLLAMA_BASE_URL",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Moonshot => "https://api.moonshot.cn/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_model(self) -> Option<&'static str> {
        match self {
            ProviderKind::Moonshot => Some("moonshot-v1-128k"),
            _ => None,
        }
    }

    /// Parses a config or env value, ignoring case.
    pub fn parse(value: &str) -> Option<ProviderKind> {
        <ProviderKind as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_kind_ignores_case() {
        assert_eq!(ProviderKind::parse("Moonshot"), Some(ProviderKind::Moonshot));
        assert_eq!(ProviderKind::parse("OPENAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse(" ollama "), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::parse("bedrock"), None);
    }

    #[test]
    fn test_only_ollama_has_no_key_env() {
        assert_eq!(ProviderKind::Ollama.api_key_env(), None);
        assert_eq!(ProviderKind::Moonshot.api_key_env(), Some("MOONSHOT_API_KEY"));
    }

    #[test]
    fn test_provider_kind_serde_names() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(serde_json::to_string(&ProviderKind::Anthropic).unwrap(), "\"anthropic\"");
    }
}
