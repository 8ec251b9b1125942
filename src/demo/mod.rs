//! # Demo programs
//!
//! Console walkthroughs of the provider API, driven by the binary's
//! subcommands. Output goes to stdout; diagnostics go to the log file.

pub mod examples;
pub mod quickstart;
pub mod repl;

use std::io::Write;

use crate::core::config::ProviderConfig;
use crate::inference::{
    CompletionOptions, CompletionProvider, ModelInfo, ProviderError, prompt_messages,
};

const RULE_WIDTH: usize = 70;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn thin_rule() -> String {
    "-".repeat(RULE_WIDTH)
}

pub fn banner(title: &str) {
    println!("{}", rule());
    println!("{title}");
    println!("{}", rule());
}

/// What to tell the user after a failed call.
pub fn remediation_hints(error: &ProviderError, config: &ProviderConfig) -> Vec<String> {
    let key_var = config
        .provider()
        .api_key_env()
        .unwrap_or("the provider's API key variable");
    match error {
        ProviderError::NotInitialized => vec![
            format!("Set {key_var}, e.g. export {key_var}=\"your-api-key-here\""),
            "Get a key at https://platform.moonshot.ai".to_string(),
        ],
        ProviderError::Api { status: 401 | 403, .. } => {
            vec![format!("Check that {key_var} is correct and active")]
        }
        ProviderError::Api { status: 429, .. } => {
            vec!["Your API key may be out of quota or rate limited".to_string()]
        }
        ProviderError::Network(_) => vec![
            "Check your internet connectivity".to_string(),
            format!("Check that {} is reachable", config.base_url()),
        ],
        ProviderError::Unsupported(_) => {
            vec!["Use --provider moonshot; it is the only implemented provider".to_string()]
        }
        _ => vec![
            format!("Check that {key_var} is set correctly"),
            "Check your internet connectivity".to_string(),
            "Check that your API key has sufficient quota".to_string(),
        ],
    }
}

pub fn print_error(error: &ProviderError, config: &ProviderConfig) {
    println!("\nERROR: {error}");
    println!("\nPlease check:");
    for (i, hint) in remediation_hints(error, config).iter().enumerate() {
        println!("  {}. {hint}", i + 1);
    }
}

pub fn print_model_info(info: &ModelInfo) {
    println!("\nModel Information:");
    println!("   Provider: {}", info.provider);
    println!("   Model: {}", info.model);
    println!("   Context Length: {} tokens", info.context_length);
    println!("   Max Output Tokens: {}", info.max_output_tokens);
    println!("   Tool Calling: {}", info.supports_tool_calling);
    println!("   Streaming: {}", info.supports_streaming);
    println!("   Recommended Temperature: {}", info.recommended_temperature);
    println!("   {}", info.description);
}

/// One-shot prompt, printed either whole or as it streams in.
pub async fn ask(
    provider: &dyn CompletionProvider,
    prompt: &str,
    system_prompt: Option<&str>,
    options: &CompletionOptions,
    stream: bool,
) -> Result<(), ProviderError> {
    if !stream {
        let reply = provider.completion(prompt, system_prompt, options).await?;
        println!("{reply}");
        return Ok(());
    }

    let messages = prompt_messages(prompt, system_prompt);
    let mut fragments = provider.stream_completion(&messages, options).await?;
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next_fragment().await {
        print!("{}", fragment?);
        // Best effort; a closed stdout only affects display.
        let _ = stdout.flush();
    }
    println!();
    Ok(())
}
