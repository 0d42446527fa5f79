//! Prompt assembly.
//!
//! The only place prompts for the downstream model are written. Every branch
//! is a pure function of the intent, the symptom-gate verdict, the retrieved
//! context and the turn itself.

use medroute_core::{ConversationTurn, Intent};
use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedContext;

/// Emergency and triage line offered in fallbacks.
pub const EMERGENCY_HOTLINE: &str = "115";

/// The system instruction and prompt body handed to the answering model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Whether `user_prompt` embeds a retrieved context block
    pub used_context: bool,
}

impl AssembledPrompt {
    fn with_context(system_prompt: impl Into<String>, user_prompt: String) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt,
            used_context: true,
        }
    }

    fn without_context(system_prompt: impl Into<String>, user_prompt: String) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt,
            used_context: false,
        }
    }
}

/// Builds the final prompts from a finished routing pass.
#[derive(Debug, Clone, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Pick the branch for `intent` and write its prompts.
    ///
    /// `has_symptoms` is only consulted for the gated intents; an unknown
    /// verdict is treated as "no symptoms yet". Whenever context is used it
    /// is embedded in full, ahead of the user's question.
    pub fn assemble(
        &self,
        intent: Intent,
        has_symptoms: Option<bool>,
        context: &RetrievedContext,
        turn: &ConversationTurn,
    ) -> AssembledPrompt {
        let question = turn.user_message.trim();
        let has_symptoms = has_symptoms.unwrap_or(false);

        match intent {
            Intent::MedicalConsultation => match context.medical.as_deref() {
                Some(block) => medical_with_context(block, question),
                None => medical_without_context(question),
            },
            Intent::DoctorRecommendation if !has_symptoms => doctor_clarification(question),
            Intent::DoctorRecommendation => match context.doctor.as_deref() {
                Some(block) => doctor_with_context(block, context.medical.as_deref(), turn),
                None => doctor_fallback(),
            },
            Intent::MedicineInquiry if !has_symptoms => medicine_clarification(question),
            Intent::MedicineInquiry => match context.medicine.as_deref() {
                Some(block) => medicine_with_context(block, question),
                None => medicine_fallback(question),
            },
            Intent::GeneralChat => AssembledPrompt::without_context(
                "You are a friendly AI assistant.",
                question.to_string(),
            ),
        }
    }
}

fn medical_with_context(block: &str, question: &str) -> AssembledPrompt {
    AssembledPrompt::with_context(
        "You are a professional medical AI assistant.\n\
         Tasks:\n\
         1. REMEMBER every symptom the patient has mentioned so far\n\
         2. Analyze the symptoms against the reference information\n\
         3. Discuss the possible conditions\n\
         4. Give practical advice\n\n\
         ALWAYS end with: this is reference information only, please consult a doctor.",
        format!("{block}\n\nQuestion: {question}\n\nAnalysis and advice:"),
    )
}

fn medical_without_context(question: &str) -> AssembledPrompt {
    AssembledPrompt::without_context(
        "You are a medical AI assistant.",
        format!("{question}\n\nRECOMMEND that the patient sees a doctor."),
    )
}

/// The fixed clarification request for gated intents without symptoms.
fn clarification(question: &str, purpose: &str, forbidden: &str) -> String {
    format!(
        "The user asks: {question}\n\n\
         IMPORTANT: The user has NOT described any specific symptom yet.\n\n\
         Reply with:\n\
         \"To {purpose}, I need to know more about your health.\n\n\
         Please tell me:\n\
         - What symptoms are you experiencing?\n\
         - How long have you had them?\n\
         - How severe are they?\"\n\n\
         Do NOT invent symptoms. Do NOT {forbidden}."
    )
}

fn doctor_clarification(question: &str) -> AssembledPrompt {
    AssembledPrompt::without_context(
        "You are a medical AI assistant. Do NOT invent symptoms.",
        clarification(question, "suggest a suitable doctor", "recommend a doctor or department"),
    )
}

fn doctor_with_context(block: &str, background: Option<&str>, turn: &ConversationTurn) -> AssembledPrompt {
    let history = if turn.conversation_window.trim().is_empty() {
        "(none)"
    } else {
        turn.conversation_window.trim()
    };
    let background = background.map(|b| format!("{b}\n\n")).unwrap_or_default();

    AssembledPrompt::with_context(
        "You are a doctor-recommendation assistant.\n\
         RULES:\n\
         - ONLY use symptoms from the conversation history and the current question\n\
         - Do NOT invent symptoms\n\
         - The specialty MUST match the symptoms\n\
         - ONLY name doctors listed in the doctor information",
        format!(
            "History:\n{history}\n\n\
             {background}{block}\n\n\
             Question: {}\n\n\
             Format:\n\
             **Symptoms**: [from the history]\n\
             **Specialty**: [name]\n\
             **Doctors** (2-3):\n\
             1. [Full name] - [Degree] - [Position] - [Department]",
            turn.user_message.trim()
        ),
    )
}

fn doctor_fallback() -> AssembledPrompt {
    AssembledPrompt::without_context(
        "You are a medical assistant.",
        format!(
            "No matching doctor was found.\n\n\
             Politely advise the user to:\n\
             1. Describe their symptoms clearly to a clinic or hospital\n\
             2. Call {EMERGENCY_HOTLINE} in an emergency\n\n\
             Do NOT name any doctor."
        ),
    )
}

fn medicine_clarification(question: &str) -> AssembledPrompt {
    AssembledPrompt::without_context(
        "You are an AI pharmacist. Do NOT invent symptoms.",
        clarification(
            question,
            "suggest a medicine, its dosage and suitable rest",
            "recommend any medicine",
        ),
    )
}

fn medicine_with_context(block: &str, question: &str) -> AssembledPrompt {
    AssembledPrompt::with_context(
        "You are an AI pharmacist.\n\
         RULES:\n\
         - ONLY recommend over-the-counter medicines\n\
         - ALWAYS state the dosage and warn about side effects\n\
         - ALWAYS close with: please consult a pharmacist or doctor before use\n\
         - Copy every REFERENCES section exactly as given, without rewording",
        format!("{block}\n\nQuestion: {question}\n\nMedicine advice and recommendations:"),
    )
}

fn medicine_fallback(question: &str) -> AssembledPrompt {
    AssembledPrompt::without_context(
        "You are a friendly and polite AI pharmacist.",
        format!(
            "The user asks: {question}\n\n\
             IMPORTANT: No suitable medicine information was found in the database.\n\n\
             Reply politely and helpfully:\n\
             \"Sorry, I don't have detailed information on a suitable medicine for your symptoms yet.\n\n\
             For accurate advice on medicines and dosage, I recommend:\n\n\
             1. **Visit the nearest clinic or hospital** so a doctor can examine you and prescribe\n\
             2. **Ask a pharmacist** at a pharmacy about over-the-counter options\n\
             3. **Call a medical hotline**: {EMERGENCY_HOTLINE} for emergencies\n\n\
             **Important:** do not buy or take medicine without advice from a doctor or pharmacist.\"\n\n\
             Do NOT name any medicine."
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(message: &str) -> ConversationTurn {
        ConversationTurn::new(message, "Patient: my chest hurts", "my chest hurts")
    }

    fn context(medical: Option<&str>, doctor: Option<&str>, medicine: Option<&str>) -> RetrievedContext {
        RetrievedContext {
            medical: medical.map(str::to_string),
            doctor: doctor.map(str::to_string),
            medicine: medicine.map(str::to_string),
        }
    }

    fn assemble(intent: Intent, has_symptoms: Option<bool>, ctx: &RetrievedContext, message: &str) -> AssembledPrompt {
        ResponseAssembler::new().assemble(intent, has_symptoms, ctx, &turn(message))
    }

    #[test]
    fn medical_embeds_context_before_question() {
        let ctx = context(Some("MEDICAL INFORMATION:\n\nMIGRAINE"), None, None);
        let p = assemble(Intent::MedicalConsultation, None, &ctx, "I have a migraine");
        assert!(p.used_context);
        let block_at = p.user_prompt.find("MEDICAL INFORMATION:\n\nMIGRAINE").unwrap();
        let question_at = p.user_prompt.find("Question: I have a migraine").unwrap();
        assert!(block_at < question_at);
        assert!(p.system_prompt.contains("consult a doctor"));
        assert!(p.system_prompt.contains("REMEMBER every symptom"));
    }

    #[test]
    fn medical_without_context_recommends_a_doctor() {
        let p = assemble(Intent::MedicalConsultation, None, &RetrievedContext::default(), "I feel odd");
        assert!(!p.used_context);
        assert!(p.user_prompt.starts_with("I feel odd"));
        assert!(p.user_prompt.contains("sees a doctor"));
    }

    #[test]
    fn doctor_without_symptoms_asks_for_them() {
        // context is ignored when the gate said no
        let ctx = context(None, Some("DOCTOR INFORMATION"), None);
        for verdict in [Some(false), None] {
            let p = assemble(Intent::DoctorRecommendation, verdict, &ctx, "which doctor?");
            assert!(!p.used_context);
            assert!(p.user_prompt.contains("What symptoms are you experiencing?"));
            assert!(p.user_prompt.contains("How long"));
            assert!(p.user_prompt.contains("How severe"));
            assert!(p.user_prompt.contains("Do NOT invent symptoms"));
            assert!(!p.user_prompt.contains("DOCTOR INFORMATION"));
        }
    }

    #[test]
    fn doctor_with_context_embeds_history_background_and_directory() {
        let ctx = context(Some("MEDICAL INFORMATION: angina"), Some("DOCTOR INFORMATION: CARDIOLOGY"), None);
        let p = assemble(Intent::DoctorRecommendation, Some(true), &ctx, "which doctor?");
        assert!(p.used_context);
        let u = &p.user_prompt;
        let history_at = u.find("Patient: my chest hurts").unwrap();
        let background_at = u.find("MEDICAL INFORMATION: angina").unwrap();
        let directory_at = u.find("DOCTOR INFORMATION: CARDIOLOGY").unwrap();
        let question_at = u.find("Question: which doctor?").unwrap();
        assert!(history_at < background_at && background_at < directory_at && directory_at < question_at);
        assert!(u.contains("**Specialty**"));
        assert!(p.system_prompt.contains("Do NOT invent symptoms"));
    }

    #[test]
    fn doctor_background_alone_is_not_context() {
        let ctx = context(Some("MEDICAL INFORMATION: angina"), None, None);
        let p = assemble(Intent::DoctorRecommendation, Some(true), &ctx, "which doctor?");
        assert!(!p.used_context);
        assert!(p.user_prompt.contains(EMERGENCY_HOTLINE));
        assert!(!p.user_prompt.contains("angina"));
    }

    #[test]
    fn medicine_without_symptoms_asks_for_them() {
        let p = assemble(Intent::MedicineInquiry, Some(false), &RetrievedContext::default(), "what medicine should I take?");
        assert!(!p.used_context);
        assert!(p.user_prompt.contains("What symptoms are you experiencing?"));
        assert!(p.user_prompt.contains("Do NOT recommend any medicine"));
    }

    #[test]
    fn medicine_with_context_forwards_block_verbatim() {
        let block = "MEDICINE INFORMATION:\n\nLOPERAMIDE\nSource: Drugs.com\nReference: https://x/y?z=1\nLast updated: 2024-05-01";
        let ctx = context(None, None, Some(block));
        let p = assemble(Intent::MedicineInquiry, Some(true), &ctx, "what should I take?");
        assert!(p.used_context);
        assert!(p.user_prompt.starts_with(block));
        assert!(p.system_prompt.contains("over-the-counter"));
        assert!(p.system_prompt.contains("side effects"));
        assert!(p.system_prompt.contains("consult a pharmacist or doctor"));
    }

    #[test]
    fn medicine_fallback_names_no_medicine() {
        let p = assemble(Intent::MedicineInquiry, Some(true), &RetrievedContext::default(), "what for diarrhea?");
        assert!(!p.used_context);
        assert!(p.user_prompt.contains("pharmacist"));
        assert!(p.user_prompt.contains("clinic"));
        assert!(p.user_prompt.contains(EMERGENCY_HOTLINE));
        assert!(p.user_prompt.contains("Do NOT name any medicine"));
    }

    #[test]
    fn general_chat_passes_message_through() {
        let ctx = context(Some("ignored"), None, None);
        let p = assemble(Intent::GeneralChat, None, &ctx, "  hello there ");
        assert!(!p.used_context);
        assert_eq!(p.user_prompt, "hello there");
    }
}
