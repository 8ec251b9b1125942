use std::fs::File;
use std::process::ExitCode;
use std::time::Duration;

use ai_providers::ProviderKind;
use ai_providers::core::assistant::DEFAULT_SYSTEM_PROMPT;
use ai_providers::core::config::{self, ConfigOverrides, ProcessEnv, ProviderConfig};
use ai_providers::demo;
use ai_providers::inference::{CompletionOptions, build_provider};
use clap::{Parser, Subcommand, ValueEnum};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "ai-providers", about = "Demos for the Moonshot (Kimi) provider layer")]
struct Args {
    /// LLM provider to use
    #[arg(short, long, value_enum)]
    provider: Option<ProviderKind>,

    /// Model name (e.g. moonshot-v1-128k)
    #[arg(short, long)]
    model: Option<String>,

    /// Override the provider's base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Start from a predefined configuration
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Log level for ai-providers.log
    #[arg(long, default_value = "debug")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// moonshot-v1-128k, 2048 max tokens
    Instruct,
    /// moonshot-v1-32k, 4096 max tokens
    Thinking,
}

#[derive(Subcommand)]
enum Command {
    /// Check the API key and run one query
    Quickstart,
    /// Walk through every provider capability
    Examples,
    /// Print model metadata (no network)
    Info,
    /// Ask a single question
    Ask {
        prompt: String,
        /// System prompt
        #[arg(short, long)]
        system: Option<String>,
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Print the reply as it arrives
        #[arg(long)]
        stream: bool,
        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Interactive conversation
    Assistant {
        /// System prompt (defaults to the config file's, then a built-in one)
        #[arg(short, long)]
        system: Option<String>,
    },
}

/// Same range `ProviderConfig` enforces for the configured temperature.
fn parse_temperature(value: &str) -> Result<f64, String> {
    let temperature: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !(0.0..=1.0).contains(&temperature) {
        return Err(format!("temperature must be between 0.0 and 1.0, got {temperature}"));
    }
    Ok(temperature)
}

fn overrides(args: &Args) -> ConfigOverrides {
    let base = match args.preset {
        Some(Preset::Instruct) => config::kimi_k2_instruct(),
        Some(Preset::Thinking) => config::kimi_k2_thinking(),
        None => ConfigOverrides::default(),
    };
    ConfigOverrides {
        provider: args.provider.or(base.provider),
        model_name: args.model.clone().or(base.model_name),
        base_url: args.base_url.clone().or(base.base_url),
        ..base
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to ai-providers.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("ai-providers.log") {
        let _ = WriteLogger::init(args.log_level, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let provider_config =
        match ProviderConfig::resolve_with(&file_config, overrides(&args), &ProcessEnv) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        };
    log::info!("Starting with {:?}", provider_config);

    let provider = match build_provider(&provider_config) {
        Ok(p) => p,
        Err(e) => {
            demo::print_error(&e, &provider_config);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Quickstart => demo::quickstart::run(provider.as_ref(), &provider_config)
            .await
            .map(|ready| ready.then_some(())),
        Command::Examples => demo::examples::run(provider.as_ref()).await.map(Some),
        Command::Info => {
            demo::print_model_info(&provider.model_info());
            Ok(Some(()))
        }
        Command::Ask {
            prompt,
            system,
            temperature,
            max_tokens,
            stream,
            timeout,
        } => {
            let options = CompletionOptions {
                temperature,
                max_tokens,
                timeout: timeout.map(Duration::from_secs),
                ..Default::default()
            };
            demo::ask(provider.as_ref(), &prompt, system.as_deref(), &options, stream)
                .await
                .map(Some)
        }
        Command::Assistant { system } => {
            let system_prompt = system
                .or_else(|| file_config.general.system_prompt.clone())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
            if let Err(e) = demo::repl::run(provider, &provider_config, &system_prompt).await {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
            Ok(Some(()))
        }
    };

    match result {
        Ok(Some(())) => ExitCode::SUCCESS,
        Ok(None) => ExitCode::FAILURE,
        Err(e) => {
            demo::print_error(&e, &provider_config);
            ExitCode::FAILURE
        }
    }
}
