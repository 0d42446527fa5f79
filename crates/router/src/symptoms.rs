//! The symptom-presence gate.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::CompletionClient;
use crate::parse::SYMPTOM_VERDICT;

/// Texts shorter than this (trimmed, in characters) never describe a symptom.
pub const MIN_EVIDENCE_CHARS: usize = 5;

/// Decides whether a conversation window already describes a concrete
/// symptom. Fails closed: errors and unclear answers mean "no".
pub struct SymptomGate {
    llm: Arc<CompletionClient>,
}

impl SymptomGate {
    pub fn new(llm: Arc<CompletionClient>) -> Self {
        Self { llm }
    }

    pub async fn has_symptoms(&self, window: &str) -> bool {
        let window = window.trim();
        if window.chars().count() < MIN_EVIDENCE_CHARS {
            debug!(len = window.chars().count(), "Window too short for symptom check");
            return false;
        }

        match self.llm.complete(&gate_prompt(window)).await {
            Ok(answer) => {
                let verdict = SYMPTOM_VERDICT.parse(&answer);
                info!(has_symptoms = verdict, answer = %answer, "Symptom gate");
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Symptom gate failed, assuming no symptoms");
                false
            }
        }
    }
}

fn gate_prompt(window: &str) -> String {
    format!(
        r#"Has the user DESCRIBED a health symptom they are experiencing?

Messages: "{window}"

HOW TO TELL:

YES - the user DESCRIBES their condition:
- "I have a headache"
- "my son has a fever of 39 degrees"
- "I'm coughing and short of breath"
- "my stomach cramps"
- "I feel dizzy"

NO - the user only ASKS, without describing anything:
- "what medicine should I take?"
- "recommend a doctor for me"
- "what disease causes headaches?"
- "which doctor is good?"
- "what medicine is good?"

IMPORTANT:
- The user must clearly describe a symptom they ARE having
- Asking about medicine or doctors WITHOUT a symptom means NO

Answer ONLY: "YES" or "NO"

Answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedReply, SequentialMockProvider};
    use medroute_core::error::ProviderError;

    fn gate(provider: Arc<SequentialMockProvider>) -> SymptomGate {
        SymptomGate::new(Arc::new(CompletionClient::new(provider, "m").with_max_retries(0)))
    }

    #[tokio::test]
    async fn short_windows_skip_the_model() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let gate = gate(provider.clone());
        for window in ["", "   ", "ouch", "  hi  \n", "đau"] {
            assert!(!gate.has_symptoms(window).await, "window: {window:?}");
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn affirmative_answer_means_symptoms() {
        let provider = Arc::new(SequentialMockProvider::texts(&["YES"]));
        assert!(gate(provider.clone()).has_symptoms("I have a headache").await);
        assert!(provider.prompts()[0].contains("\"I have a headache\""));
    }

    #[tokio::test]
    async fn negative_answer_means_no_symptoms() {
        let provider = Arc::new(SequentialMockProvider::texts(&["NO"]));
        assert!(!gate(provider).has_symptoms("what medicine should I take?").await);
    }

    #[tokio::test]
    async fn errors_fail_closed() {
        let provider = Arc::new(SequentialMockProvider::new(vec![ScriptedReply::Error(
            ProviderError::Network("down".into()),
        )]));
        assert!(!gate(provider).has_symptoms("my chest hurts a lot").await);
    }
}
