//! # Configuration
//!
//! Resolves provider settings with a clear override hierarchy:
//! explicit values → env vars → config file → static defaults.
//!
//! Config lives at `~/.ai-providers/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! Environment access goes through [`EnvSource`] so resolution can be tested
//! without touching the process environment.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ProviderKind;

// ============================================================================
// Config File Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub moonshot: ProviderSection,
    #[serde(default)]
    pub openai: ProviderSection,
    #[serde(default)]
    pub anthropic: ProviderSection,
    #[serde(default)]
    pub ollama: ProviderSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProviderSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl FileConfig {
    pub fn section(&self, kind: ProviderKind) -> &ProviderSection {
        match kind {
            ProviderKind::Moonshot => &self.moonshot,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Ollama => &self.ollama,
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_TEMPERATURE: f64 = 0.6;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Selects the provider kind when nothing more explicit is given.
pub const PROVIDER_ENV: &str = "AI_PROVIDER";
/// Selects the model name when nothing more explicit is given.
pub const MODEL_ENV: &str = "AI_MODEL";

// ============================================================================
// Environment Source
// ============================================================================

/// Where environment variables come from.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment. Empty values count as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Explicit values that win over every other source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub provider: Option<ProviderKind>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Kimi K2 Instruct on the 128k-context model.
pub fn kimi_k2_instruct() -> ConfigOverrides {
    ConfigOverrides {
        provider: Some(ProviderKind::Moonshot),
        model_name: Some("moonshot-v1-128k".to_string()),
        temperature: Some(0.6),
        max_tokens: Some(2048),
        ..Default::default()
    }
}

/// Kimi K2 with a larger output budget for longer reasoning.
pub fn kimi_k2_thinking() -> ConfigOverrides {
    ConfigOverrides {
        provider: Some(ProviderKind::Moonshot),
        model_name: Some("moonshot-v1-32k".to_string()),
        temperature: Some(0.6),
        max_tokens: Some(4096),
        ..Default::default()
    }
}

/// Fully resolved provider settings. Immutable once built.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    provider: ProviderKind,
    model_name: String,
    api_key: Option<String>,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
}

impl ProviderConfig {
    /// Resolves `kind` + `model_name` against the process environment only.
    pub fn from_env(kind: ProviderKind, model_name: impl Into<String>) -> Result<Self, ConfigError> {
        let overrides = ConfigOverrides {
            provider: Some(kind),
            model_name: Some(model_name.into()),
            ..Default::default()
        };
        Self::resolve_with(&FileConfig::default(), overrides, &ProcessEnv)
    }

    /// Collapses overrides → env → config file → defaults.
    ///
    /// A missing API key is not an error; the provider reports it when a
    /// request is attempted.
    pub fn resolve_with(
        file: &FileConfig,
        overrides: ConfigOverrides,
        env: &impl EnvSource,
    ) -> Result<Self, ConfigError> {
        // Provider: explicit → env → config → default
        let provider = match overrides.provider {
            Some(kind) => kind,
            None => match env
                .var(PROVIDER_ENV)
                .or_else(|| file.general.default_provider.clone())
            {
                Some(name) => {
                    ProviderKind::parse(&name).ok_or(ConfigError::UnknownProvider(name))?
                }
                None => ProviderKind::default(),
            },
        };

        // Model: explicit → env → config → per-provider default
        let model_name = overrides
            .model_name
            .or_else(|| env.var(MODEL_ENV))
            .or_else(|| file.general.default_model.clone())
            .or_else(|| provider.default_model().map(str::to_string))
            .ok_or(ConfigError::MissingModel(provider))?;

        let section = file.section(provider);

        // API key: explicit → env → config. May stay empty (local providers).
        let api_key = overrides
            .api_key
            .or_else(|| provider.api_key_env().and_then(|name| env.var(name)))
            .or_else(|| section.api_key.clone());

        // Base URL: explicit → env → config → static default
        let base_url = overrides
            .base_url
            .or_else(|| env.var(provider.base_url_env()))
            .or_else(|| section.base_url.clone())
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let temperature = overrides
            .temperature
            .or(file.general.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }

        let max_tokens = overrides
            .max_tokens
            .or(file.general.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        if api_key.is_none() {
            debug!("No API key resolved for provider {}", provider);
        }

        Ok(Self {
            provider,
            model_name,
            api_key,
            base_url,
            temperature,
            max_tokens,
        })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    UnknownProvider(String),
    MissingModel(ProviderKind),
    InvalidTemperature(f64),
    InvalidMaxTokens,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::UnknownProvider(name) => write!(f, "unknown provider: {name}"),
            ConfigError::MissingModel(kind) => {
                write!(f, "no model configured for provider {kind}")
            }
            ConfigError::InvalidTemperature(t) => {
                write!(f, "temperature must be between 0.0 and 1.0, got {t}")
            }
            ConfigError::InvalidMaxTokens => write!(f, "max_tokens must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.ai-providers/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".ai-providers").join("config.toml"))
}

/// Load config from `~/.ai-providers/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `FileConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<FileConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(FileConfig::default());
        }
    };
    load_config_from(&path)
}

/// Same as [`load_config`] for an arbitrary path.
pub fn load_config_from(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: FileConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config general section: {:?}", config.general);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# ai-providers configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: explicit flags → env vars → this file → defaults.

# [general]
# default_provider = "moonshot"      # "moonshot", "openai", "anthropic", "ollama"
# default_model = "moonshot-v1-128k"
# temperature = 0.6                  # 0.0 to 1.0
# max_tokens = 2048
# system_prompt = "You are Kimi, an AI assistant created by Moonshot AI."

# [moonshot]
# api_key = "sk-..."                 # Or set MOONSHOT_API_KEY env var
# base_url = "https://api.moonshot.cn/v1"

# [openai]
# api_key = "sk-..."                 # Or set OPENAI_API_KEY env var

# [ollama]
# base_url = "http://localhost:11434"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn moonshot(model: &str) -> ConfigOverrides {
        ConfigOverrides {
            provider: Some(ProviderKind::Moonshot),
            model_name: Some(model.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_from_env_when_not_explicit() {
        let env = env(&[("MOONSHOT_API_KEY", "sk-env")]);
        let config =
            ProviderConfig::resolve_with(&FileConfig::default(), moonshot("moonshot-v1-8k"), &env)
                .unwrap();
        assert_eq!(config.api_key(), Some("sk-env"));
    }

    #[test]
    fn test_explicit_api_key_wins_over_env() {
        let env = env(&[("MOONSHOT_API_KEY", "sk-env")]);
        let overrides = ConfigOverrides {
            api_key: Some("sk-explicit".to_string()),
            ..moonshot("moonshot-v1-8k")
        };
        let config = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env).unwrap();
        assert_eq!(config.api_key(), Some("sk-explicit"));
    }

    #[test]
    fn test_missing_key_is_not_an_error() {
        let config = ProviderConfig::resolve_with(
            &FileConfig::default(),
            moonshot("moonshot-v1-8k"),
            &env(&[]),
        )
        .unwrap();
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_ollama_ignores_other_key_vars() {
        let env = env(&[("MOONSHOT_API_KEY", "sk-env"), ("OPENAI_API_KEY", "sk-oa")]);
        let overrides = ConfigOverrides {
            provider: Some(ProviderKind::Ollama),
            model_name: Some("llama3".to_string()),
            ..Default::default()
        };
        let config = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env).unwrap();
        assert_eq!(config.api_key(), None);
        assert_eq!(config.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_default_base_urls_per_provider() {
        for (kind, url) in [
            (ProviderKind::Moonshot, "https://api.moonshot.cn/v1"),
            (ProviderKind::OpenAi, "https://api.openai.com/v1"),
            (ProviderKind::Anthropic, "https://api.anthropic.com"),
            (ProviderKind::Ollama, "http://localhost:11434"),
        ] {
            let overrides = ConfigOverrides {
                provider: Some(kind),
                model_name: Some("m".to_string()),
                ..Default::default()
            };
            let config =
                ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env(&[])).unwrap();
            assert_eq!(config.base_url(), url, "wrong default for {kind}");
        }
    }

    #[test]
    fn test_base_url_precedence() {
        let file: FileConfig = toml::from_str(
            r#"
[moonshot]
base_url = "https://file.example/v1"
"#,
        )
        .unwrap();

        let from_file =
            ProviderConfig::resolve_with(&file, moonshot("m"), &env(&[])).unwrap();
        assert_eq!(from_file.base_url(), "https://file.example/v1");

        let env = env(&[("MOONSHOT_BASE_URL", "https://env.example/v1")]);
        let from_env = ProviderConfig::resolve_with(&file, moonshot("m"), &env).unwrap();
        assert_eq!(from_env.base_url(), "https://env.example/v1");

        let explicit = ConfigOverrides {
            base_url: Some("https://explicit.example/v1".to_string()),
            ..moonshot("m")
        };
        let from_explicit = ProviderConfig::resolve_with(&file, explicit, &env).unwrap();
        assert_eq!(from_explicit.base_url(), "https://explicit.example/v1");
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let config =
            ProviderConfig::resolve_with(&FileConfig::default(), ConfigOverrides::default(), &env(&[]))
                .unwrap();
        assert_eq!(config.provider(), ProviderKind::Moonshot);
        assert_eq!(config.model_name(), "moonshot-v1-128k");
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens(), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_provider_and_model_from_env() {
        let env = env(&[("AI_PROVIDER", "openai"), ("AI_MODEL", "gpt-4o")]);
        let config =
            ProviderConfig::resolve_with(&FileConfig::default(), ConfigOverrides::default(), &env)
                .unwrap();
        assert_eq!(config.provider(), ProviderKind::OpenAi);
        assert_eq!(config.model_name(), "gpt-4o");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let env = env(&[("AI_PROVIDER", "bedrock")]);
        let result =
            ProviderConfig::resolve_with(&FileConfig::default(), ConfigOverrides::default(), &env);
        assert!(matches!(result, Err(ConfigError::UnknownProvider(name)) if name == "bedrock"));
    }

    #[test]
    fn test_non_moonshot_requires_model() {
        let overrides = ConfigOverrides {
            provider: Some(ProviderKind::Anthropic),
            ..Default::default()
        };
        let result = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env(&[]));
        assert!(matches!(result, Err(ConfigError::MissingModel(ProviderKind::Anthropic))));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let overrides = ConfigOverrides {
            temperature: Some(1.5),
            ..moonshot("m")
        };
        let result = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env(&[]));
        assert!(matches!(result, Err(ConfigError::InvalidTemperature(t)) if t == 1.5));
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let overrides = ConfigOverrides {
            max_tokens: Some(0),
            ..moonshot("m")
        };
        let result = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env(&[]));
        assert!(matches!(result, Err(ConfigError::InvalidMaxTokens)));
    }

    #[test]
    fn test_presets() {
        let instruct =
            ProviderConfig::resolve_with(&FileConfig::default(), kimi_k2_instruct(), &env(&[]))
                .unwrap();
        assert_eq!(instruct.model_name(), "moonshot-v1-128k");
        assert_eq!(instruct.max_tokens(), 2048);

        let thinking =
            ProviderConfig::resolve_with(&FileConfig::default(), kimi_k2_thinking(), &env(&[]))
                .unwrap();
        assert_eq!(thinking.model_name(), "moonshot-v1-32k");
        assert_eq!(thinking.max_tokens(), 4096);
        assert_eq!(thinking.base_url(), "https://api.moonshot.cn/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let overrides = ConfigOverrides {
            api_key: Some("sk-very-secret".to_string()),
            ..moonshot("m")
        };
        let config = ProviderConfig::resolve_with(&FileConfig::default(), overrides, &env(&[])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
default_provider = "moonshot"
default_model = "moonshot-v1-32k"
temperature = 0.3
max_tokens = 1024
system_prompt = "Be brief."

[moonshot]
api_key = "sk-test-123"

[ollama]
base_url = "http://192.168.1.100:11434"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_provider.as_deref(), Some("moonshot"));
        assert_eq!(config.general.max_tokens, Some(1024));
        assert_eq!(config.moonshot.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(
            config.section(ProviderKind::Ollama).base_url.as_deref(),
            Some("http://192.168.1.100:11434")
        );

        let resolved =
            ProviderConfig::resolve_with(&config, ConfigOverrides::default(), &env(&[])).unwrap();
        assert_eq!(resolved.model_name(), "moonshot-v1-32k");
        assert_eq!(resolved.temperature(), 0.3);
        assert_eq!(resolved.api_key(), Some("sk-test-123"));
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[general]
default_model = "my-model"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_model.as_deref(), Some("my-model"));
        assert!(config.general.default_provider.is_none());
        assert!(config.moonshot.api_key.is_none());
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let env = env(&[("MOONSHOT_API_KEY", "")]);
        let config =
            ProviderConfig::resolve_with(&FileConfig::default(), moonshot("m"), &env).unwrap();
        assert_eq!(config.api_key(), None);
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ai-providers-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_missing_file_writes_template() {
        let dir = scratch_dir("template");
        let path = dir.join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert!(config.general.default_model.is_none());
        assert!(path.exists());

        // The template is entirely commented out, so it parses to defaults
        let reloaded = load_config_from(&path).unwrap();
        assert!(reloaded.general.default_provider.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = scratch_dir("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "[general\ntemperature = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_from_env_keeps_explicit_kind_and_model() {
        let config = ProviderConfig::from_env(ProviderKind::Moonshot, "moonshot-v1-8k").unwrap();
        assert_eq!(config.provider(), ProviderKind::Moonshot);
        assert_eq!(config.model_name(), "moonshot-v1-8k");
    }
}
