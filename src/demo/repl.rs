//! Interactive console session with an [`Assistant`].
//!
//! Commands: `quit` / `exit` / `q`, `clear`, `code: <task>`. Anything else is
//! a question.

use std::io::Write;
use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{banner, print_error};
use crate::core::assistant::Assistant;
use crate::core::config::ProviderConfig;
use crate::inference::CompletionProvider;

/// A parsed line of console input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Clear,
    Code(String),
    Ask(String),
    Empty,
}

pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }

    if let Some(task) = line
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("code:"))
        .map(|_| &line[5..])
    {
        return ReplCommand::Code(task.trim().to_string());
    }

    match line.to_lowercase().as_str() {
        "quit" | "exit" | "q" => ReplCommand::Quit,
        "clear" => ReplCommand::Clear,
        _ => ReplCommand::Ask(line.to_string()),
    }
}

fn prompt() {
    print!("You: ");
    let _ = std::io::stdout().flush();
}

/// Runs until `quit` or end of input.
pub async fn run(
    provider: Arc<dyn CompletionProvider>,
    config: &ProviderConfig,
    system_prompt: &str,
) -> std::io::Result<()> {
    banner("Research Assistant (Powered by Kimi K2)");
    println!("\nType your questions. Type 'quit' to exit, 'clear' to reset,");
    println!("or 'code: <task>' to get code suggestions.\n");

    let mut assistant = Assistant::new(provider, system_prompt);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Assistant ready! Ask me anything.\n");

    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye!");
            break;
        };

        let result = match parse_command(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                println!("\nGoodbye!");
                break;
            }
            ReplCommand::Clear => {
                assistant.clear_history();
                println!("\nConversation history cleared.\n");
                continue;
            }
            ReplCommand::Code(task) => {
                println!("\nGenerating code...\n");
                assistant.code_suggestion(&task).await
            }
            ReplCommand::Ask(question) => assistant.ask(&question).await,
        };

        match result {
            Ok(reply) => println!("\nKimi: {reply}\n"),
            Err(e) => {
                warn!("Assistant request failed: {}", e);
                print_error(&e, config);
                println!();
            }
        }
    }

    info!("Assistant session ended after {} turns", assistant.turns());
    Ok(())
}
