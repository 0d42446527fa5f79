//! Intent classification.

use std::sync::Arc;

use medroute_core::Intent;
use tracing::{info, warn};

use crate::llm::CompletionClient;
use crate::parse::INTENT_TOKENS;

/// Maps a raw user utterance to one of the four conversation intents with a
/// single constrained completion.
pub struct IntentClassifier {
    llm: Arc<CompletionClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<CompletionClient>) -> Self {
        Self { llm }
    }

    /// Classify `user_message`. Never fails: a model error or an answer
    /// naming no label yields [`Intent::GeneralChat`].
    pub async fn classify(&self, user_message: &str) -> Intent {
        let prompt = classification_prompt(user_message);
        match self.llm.complete(&prompt).await {
            Ok(answer) => {
                let intent = INTENT_TOKENS.parse(&answer);
                info!(intent = %intent, answer = %answer, "Intent classified");
                intent
            }
            Err(e) => {
                warn!(error = %e, "Intent classification failed, defaulting to general chat");
                Intent::GeneralChat
            }
        }
    }
}

fn classification_prompt(user_message: &str) -> String {
    format!(
        r#"Analyze the user's message and determine its intent.

Message: "{user_message}"

Intent types:

1. {medical} - medical consultation, symptom analysis
   - The user DESCRIBES symptoms they are experiencing
   - Asks about causes or possible conditions
   - e.g. "I have a headache", "my child has a high fever", "what does this symptom mean?"

2. {doctor} - clinician or department recommendation
   - Asks about doctors, clinics or specialties
   - Wants to find a doctor to see
   - e.g. "which doctor is good?", "where should I get checked?", "recommend a doctor"

3. {medicine} - questions about medicines and dosage
   - Asks which medicine treats something
   - Dosage and how to take a medicine
   - e.g. "what medicine should I take?", "paracetamol dosage?", "does this drug have side effects?"

4. {general} - general conversation
   - Greetings, thanks, apologies
   - Questions about the assistant itself
   - e.g. "hello", "thank you", "who are you?"

Reply with ONLY the intent name (one of the four above).

Intent:"#,
        medical = Intent::MedicalConsultation.label(),
        doctor = Intent::DoctorRecommendation.label(),
        medicine = Intent::MedicineInquiry.label(),
        general = Intent::GeneralChat.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedReply, SequentialMockProvider};
    use medroute_core::error::ProviderError;

    fn classifier(provider: Arc<SequentialMockProvider>) -> IntentClassifier {
        let llm = CompletionClient::new(provider, "mock-model").with_max_retries(0);
        IntentClassifier::new(Arc::new(llm))
    }

    #[tokio::test]
    async fn classifies_from_model_label() {
        let provider = Arc::new(SequentialMockProvider::texts(&["DOCTOR_RECOMMENDATION"]));
        let intent = classifier(provider.clone()).classify("which doctor should I see?").await;
        assert_eq!(intent, Intent::DoctorRecommendation);

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("which doctor should I see?"));
        for label in Intent::ALL.map(|i| i.label()) {
            assert!(prompt.contains(label), "prompt lists {label}");
        }
    }

    #[tokio::test]
    async fn model_is_always_consulted() {
        let provider = Arc::new(SequentialMockProvider::texts(&["GENERAL_CHAT"]));
        let intent = classifier(provider.clone()).classify("I have chest pain, which doctor?").await;
        assert_eq!(intent, Intent::GeneralChat);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_output_defaults_to_general_chat() {
        let provider = Arc::new(SequentialMockProvider::texts(&["¯\\_(ツ)_/¯"]));
        assert_eq!(classifier(provider).classify("hmm").await, Intent::GeneralChat);
    }

    #[tokio::test]
    async fn provider_error_defaults_to_general_chat() {
        let provider = Arc::new(SequentialMockProvider::new(vec![ScriptedReply::Error(
            ProviderError::ApiError { status_code: 500, message: "boom".into() },
        )]));
        assert_eq!(classifier(provider).classify("what medicine?").await, Intent::GeneralChat);
    }
}
