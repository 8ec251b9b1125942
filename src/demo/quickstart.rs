//! Smallest possible end-to-end check: key present, key accepted, one query.

use log::info;

use super::{banner, print_model_info, thin_rule};
use crate::core::config::ProviderConfig;
use crate::inference::{CompletionOptions, CompletionProvider, ProviderError};

const QUICKSTART_PROMPT: &str = "In 2-3 sentences, explain what makes the Kimi K2 model unique.";

/// Returns `Ok(false)` when the key is missing or rejected.
pub async fn run(
    provider: &dyn CompletionProvider,
    config: &ProviderConfig,
) -> Result<bool, ProviderError> {
    println!();
    banner("Kimi K2 Quick Start");

    if config.api_key().is_none() {
        let var = config.provider().api_key_env().unwrap_or("API key");
        println!("\n{var} not set!");
        println!("\nPlease run:");
        println!("  export {var}=\"your-api-key-here\"");
        println!("\nGet your key at: https://platform.moonshot.ai");
        return Ok(false);
    }

    println!("\nValidating API key...");
    if !provider.validate_credentials().await {
        let var = config.provider().api_key_env().unwrap_or("API key");
        println!("Invalid API key. Please check your {var}.");
        return Ok(false);
    }
    println!("API key valid!");

    print_model_info(&provider.model_info());

    println!("\nTesting with a simple query...");
    println!("{}", thin_rule());

    let options = CompletionOptions::default()
        .with_temperature(0.6)
        .with_max_tokens(256);
    let reply = provider.completion(QUICKSTART_PROMPT, None, &options).await?;

    println!("\nKimi K2: {reply}");
    println!("{}", thin_rule());
    info!("Quickstart completed ({} chars)", reply.len());

    println!("\nSuccess! Kimi K2 is working correctly.");
    println!("\nNext steps:");
    println!("  1. Try the interactive assistant:  ai-providers assistant");
    println!("  2. Walk through every capability:  ai-providers examples");
    println!("  3. Ask a single question:          ai-providers ask \"...\" --stream");
    println!();
    Ok(true)
}
