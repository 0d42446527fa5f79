//! Parsers for the model's short constrained answers.
//!
//! Each classifier owns an explicit token table. Answers are upper-cased and
//! matched by substring containment, so surrounding prose or punctuation does
//! not matter, but row order and reject tokens do.

use medroute_core::Intent;

/// A priority-ordered table: the first row whose tokens appear in the
/// answer wins; no match yields `fallback`.
pub struct TokenTable<T: 'static> {
    pub rows: &'static [(T, &'static [&'static str])],
    pub fallback: T,
}

impl<T: Copy> TokenTable<T> {
    pub fn parse(&self, answer: &str) -> T {
        let answer = answer.to_uppercase();
        self.rows
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|t| answer.contains(t)))
            .map(|(value, _)| *value)
            .unwrap_or(self.fallback)
    }
}

/// A yes/no verdict: accepted only if an affirmative token is present and
/// no reject token is. Reject tokens are checked first.
pub struct Verdict {
    pub affirm: &'static [&'static str],
    pub reject: &'static [&'static str],
}

impl Verdict {
    pub fn parse(&self, answer: &str) -> bool {
        let answer = answer.to_uppercase();
        if self.reject.iter().any(|t| answer.contains(t)) {
            return false;
        }
        self.affirm.iter().any(|t| answer.contains(t))
    }
}

/// Full labels only. Medicine beats doctor beats medical; a model that names
/// several labels resolves to the earliest row.
pub const INTENT_TOKENS: TokenTable<Intent> = TokenTable {
    rows: &[
        (Intent::MedicineInquiry, &["MEDICINE_INQUIRY"]),
        (Intent::DoctorRecommendation, &["DOCTOR_RECOMMENDATION"]),
        (Intent::MedicalConsultation, &["MEDICAL_CONSULTATION"]),
        (Intent::GeneralChat, &["GENERAL_CHAT"]),
    ],
    fallback: Intent::GeneralChat,
};

/// Symptom gate answers.
pub const SYMPTOM_VERDICT: Verdict = Verdict {
    affirm: &["YES", "TRUE"],
    reject: &[],
};

/// Medicine adjudication answers. "NOT SUITABLE" and "UNSUITABLE" both
/// contain the affirmative token.
pub const ADJUDICATION_VERDICT: Verdict = Verdict {
    affirm: &["SUITABLE"],
    reject: &["NOT", "UNSUITABLE"],
};
