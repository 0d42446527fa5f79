//! `medroute route`: Route one message and print the result as JSON.

use std::path::{Path, PathBuf};

use medroute_config::AppConfig;
use medroute_core::message::{Conversation, Message, Role};
use serde::Deserialize;

use crate::runtime::build_workflow;

/// One prior message in a `--history` file.
#[derive(Debug, Deserialize)]
struct HistoryEntry {
    role: Role,
    content: String,
}

fn parse_history(json: &str) -> Result<Conversation, serde_json::Error> {
    let entries: Vec<HistoryEntry> = serde_json::from_str(json)?;
    let mut conversation = Conversation::new();
    for entry in entries {
        conversation.push(match entry.role {
            Role::User => Message::user(entry.content),
            Role::Assistant => Message::assistant(entry.content),
            Role::System => Message::system(entry.content),
        });
    }
    Ok(conversation)
}

fn load_history(path: &Path) -> Result<Conversation, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    Ok(parse_history(&json).map_err(|e| format!("Invalid history {}: {e}", path.display()))?)
}

pub async fn run(message: String, history: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let conversation = match history {
        Some(path) => load_history(&path)?,
        None => Conversation::new(),
    };

    let (_, workflow) = build_workflow(&config).await?;
    let turn = conversation.turn(message, config.routing.window_turns);
    let result = workflow.route(&turn).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
