//! Walks through every provider capability once.

use std::io::Write;

use schemars::JsonSchema;
use serde::Deserialize;

use super::{banner, print_model_info};
use crate::inference::{
    CompletionOptions, CompletionProvider, Message, ProviderError, ToolChoice, ToolDefinition,
    ToolRequest,
};

// ── Tool argument schemas ───────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
pub struct CorrelationDimensionArgs {
    /// Numerical data points to analyze
    pub data_points: Vec<f64>,
    /// Embedding dimension for phase space reconstruction
    pub embedding_dimension: u32,
    /// Minimum scale for the calculation
    pub min_scale: Option<f64>,
    /// Maximum scale for the calculation
    pub max_scale: Option<f64>,
}

#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
pub struct ProteinStructureArgs {
    /// PDB identifier (e.g. "1ABC")
    pub pdb_id: String,
}

/// Tools offered to the model in the tool-calling example.
pub fn demo_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::for_args::<CorrelationDimensionArgs>(
            "calculate_correlation_dimension",
            "Calculate the correlation dimension (D2) of a dataset using the \
             Grassberger-Procaccia algorithm.",
        ),
        ToolDefinition::for_args::<ProteinStructureArgs>(
            "fetch_protein_structure",
            "Fetch a protein structure from the PDB database.",
        ),
    ]
}

// ── Examples ────────────────────────────────────────────────────────────────

fn model_info(provider: &dyn CompletionProvider) {
    banner("Example 1: Model Information");
    print_model_info(&provider.model_info());
    println!();
}

async fn simple_completion(provider: &dyn CompletionProvider) -> Result<(), ProviderError> {
    banner("Example 2: Simple Text Completion");
    let options = CompletionOptions::default()
        .with_temperature(0.6)
        .with_max_tokens(512);
    let reply = provider
        .completion(
            "What makes fractal self-similarity useful for understanding complex systems?",
            Some("You are Kimi, an AI assistant specializing in systems theory and complexity science."),
            &options,
        )
        .await?;
    println!("\nResponse:\n{reply}\n");
    Ok(())
}

async fn chat_conversation(provider: &dyn CompletionProvider) -> Result<(), ProviderError> {
    banner("Example 3: Multi-turn Chat Conversation");
    let messages = [
        Message::system("You are Kimi, an AI assistant created by Moonshot AI."),
        Message::user("Can you explain what makes you different from other language models?"),
    ];
    let options = CompletionOptions::default().with_max_tokens(512);
    let reply = provider.chat_completion(&messages, &options).await?;
    println!("\nKimi: {reply}\n");
    Ok(())
}

async fn tool_calling(provider: &dyn CompletionProvider) -> Result<(), ProviderError> {
    banner("Example 4: Tool Calling");
    let tools = demo_tools();
    let messages = [Message::user(
        "I need the correlation dimension of a 1000-point time series, and then the \
         protein structure 6XYZ from PDB. Can you help?",
    )];
    let options = CompletionOptions::default();
    let result = provider
        .tool_completion(ToolRequest {
            messages: &messages,
            tools: &tools,
            tool_choice: ToolChoice::Auto,
            options: &options,
        })
        .await?;

    println!("\nResponse content: {}", result.content.as_deref().unwrap_or("<none>"));
    if result.has_tool_calls() {
        println!("\nTool calls requested:");
        for call in &result.tool_calls {
            println!("  - {}", call.function.name);
            println!("    Arguments: {}", call.function.arguments);
        }
    }
    println!();
    Ok(())
}

async fn streaming(provider: &dyn CompletionProvider) -> Result<(), ProviderError> {
    banner("Example 5: Streaming Response");
    let messages = [Message::user(
        "Write a short poem about fractals and self-similarity in nature.",
    )];
    let options = CompletionOptions::default().with_max_tokens(256);
    let mut fragments = provider.stream_completion(&messages, &options).await?;

    println!("\nStreaming response:\n");
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next_fragment().await {
        print!("{}", fragment?);
        let _ = stdout.flush();
    }
    println!("\n");
    Ok(())
}

/// Runs every example in order, stopping at the first failure.
pub async fn run(provider: &dyn CompletionProvider) -> Result<(), ProviderError> {
    println!();
    banner("Moonshot Kimi K2 Provider - Usage Examples");
    println!();

    model_info(provider);
    simple_completion(provider).await?;
    chat_conversation(provider).await?;
    tool_calling(provider).await?;
    streaming(provider).await?;

    banner("All examples completed successfully!");
    Ok(())
}
