//! Conversation intents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The coarse category assigned to a user turn. Decides which response
/// strategy the router takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Describes symptoms or asks about a condition
    MedicalConsultation,
    /// Wants a clinician or department
    DoctorRecommendation,
    /// Asks about medicines, dosage, side effects
    MedicineInquiry,
    /// Anything else: greetings, thanks, questions about the assistant
    GeneralChat,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::MedicalConsultation,
        Intent::DoctorRecommendation,
        Intent::MedicineInquiry,
        Intent::GeneralChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::MedicalConsultation => "medical_consultation",
            Intent::DoctorRecommendation => "doctor_recommendation",
            Intent::MedicineInquiry => "medicine_inquiry",
            Intent::GeneralChat => "general_chat",
        }
    }

    /// The upper-case label the classifier prompt asks the model to emit.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::MedicalConsultation => "MEDICAL_CONSULTATION",
            Intent::DoctorRecommendation => "DOCTOR_RECOMMENDATION",
            Intent::MedicineInquiry => "MEDICINE_INQUIRY",
            Intent::GeneralChat => "GENERAL_CHAT",
        }
    }

    /// Intents that must pass the symptom gate before retrieval.
    pub fn requires_symptoms(&self) -> bool {
        matches!(self, Intent::DoctorRecommendation | Intent::MedicineInquiry)
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::GeneralChat
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
