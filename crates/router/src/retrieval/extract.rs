//! Symptom phrase extraction and validation.

use medroute_core::error::ProviderError;
use tracing::{debug, warn};

use crate::llm::CompletionClient;

/// Phrases shorter than this (in characters) are ignored.
const MIN_PHRASE_CHARS: usize = 2;

/// How literal the extraction prompt asks the model to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Only symptoms the user literally stated, short comma list.
    Literal,
    /// Every symptom mentioned in the dialogue.
    Inclusive,
}

/// Ask the model for the symptoms mentioned in `dialogue`. Returns the raw,
/// trimmed answer.
pub async fn extract_symptoms(
    llm: &CompletionClient,
    dialogue: &str,
    mode: ExtractionMode,
) -> Result<String, ProviderError> {
    let prompt = match mode {
        ExtractionMode::Literal => format!(
            "From the conversation, list ONLY the symptoms the user has STATED:\n\
             {dialogue}\n\n\
             RULES:\n\
             - ONLY include symptoms that appear in the user's messages\n\
             - Do NOT add any other symptoms\n\
             - Short format: \"symptom1, symptom2\"\n\n\
             Symptoms:"
        ),
        ExtractionMode::Inclusive => format!(
            "From the conversation, list ALL symptoms.\n\n\
             Conversation:\n{dialogue}\n\n\
             List only the symptoms, separated by commas.\n\n\
             Symptoms:"
        ),
    };
    let answer = llm.complete(&prompt).await?;
    debug!(mode = ?mode, answer = %answer, "Symptoms extracted");
    Ok(answer)
}

/// Split a comma-separated answer into trimmed phrases.
pub fn split_phrases(answer: &str) -> Vec<String> {
    answer
        .split([',', '\n'])
        .map(|p| p.trim().trim_end_matches('.').trim())
        .filter(|p| p.chars().count() >= MIN_PHRASE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Keep only phrases that occur (case-insensitively) in `source`.
pub fn validate_phrases(phrases: Vec<String>, source: &str) -> Vec<String> {
    let source = source.to_lowercase();
    phrases
        .into_iter()
        .filter(|phrase| {
            let keep = source.contains(&phrase.to_lowercase());
            if !keep {
                warn!(phrase = %phrase, "Dropping symptom not present in the conversation");
            }
            keep
        })
        .collect()
}
