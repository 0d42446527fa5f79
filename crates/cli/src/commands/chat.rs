//! `medroute chat`: Interactive dialogue.
//!
//! Every turn is routed first; the assembled prompts then go to the model
//! for the user-facing answer. Both sides of the exchange are kept so the
//! next turn sees them in its windows.

use std::io::Write;

use medroute_config::AppConfig;
use medroute_core::message::{Conversation, Message};
use medroute_router::CompletionClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::runtime::build_workflow;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.model.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set MEDROUTE_API_KEY or OPENAI_API_KEY, or add api_key under [model] in:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let (provider, workflow) = build_workflow(&config).await?;
    let answerer = CompletionClient::from_config(provider, &config.model).with_max_tokens(config.model.max_tokens);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        MedRoute - Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.model.provider);
    println!("  Model:     {}", config.model.name);
    println!("  Data:      {}", config.index.data_dir);
    println!();
    println!("  Describe how you feel, ask about medicines or doctors.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let turn = conversation.turn(line, config.routing.window_turns);
        let routed = workflow.route(&turn).await;
        conversation.push(Message::user(line));

        eprint!("  ...");
        match answerer
            .generate(&routed.system_prompt, &routed.user_prompt, config.model.temperature)
            .await
        {
            Ok(answer) => {
                eprint!("\r     \r");
                println!();
                for l in answer.lines() {
                    println!("  Assistant > {l}");
                }
                println!();
                conversation.push(Message::assistant(answer));
            }
            Err(e) => {
                eprint!("\r     \r");
                warn!(error = %e, intent = %routed.intent, "Answer generation failed");
                eprintln!("  [Error] The assistant could not answer right now. Please try again.");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}
