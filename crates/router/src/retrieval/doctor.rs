//! Clinician retrieval: symptoms → specialties → departments.

use medroute_core::error::Error;
use medroute_core::index::{ContextDocument, DocumentCategory};
use medroute_core::message::ConversationTurn;
use tracing::{debug, info, warn};

use super::extract::{ExtractionMode, extract_symptoms};
use super::scoring::{ScoredCandidate, contains_ci, dedup_max, fuse_department};
use super::{ContextRetriever, section, titled_block};
use crate::normalize::fold_diacritics;

/// Symptom → candidate specialties. A symptom may map to several.
pub const SYMPTOM_SPECIALTIES: &[(&str, &[&str])] = &[
    ("headache", &["Internal Medicine", "Cardiology", "Endocrinology"]),
    ("abdominal pain", &["Gastroenterology", "Internal Medicine"]),
    ("heartburn", &["Gastroenterology"]),
    ("diarrhea", &["Gastroenterology"]),
    ("constipation", &["Gastroenterology"]),
    ("chest pain", &["Cardiology", "Internal Medicine"]),
    ("shortness of breath", &["Cardiology", "Intensive Care"]),
    ("cough", &["ENT"]),
    ("runny nose", &["ENT"]),
    ("sore throat", &["ENT"]),
    ("blurred vision", &["Ophthalmology"]),
    ("itching", &["Dermatology"]),
    ("rash", &["Dermatology"]),
];

/// The closed list offered to the model when the table has no match.
/// `ENT` is last: it is a substring of other names.
pub const SPECIALTY_CHOICES: &[&str] = &[
    "Cardiology",
    "Gastroenterology",
    "Endocrinology",
    "Ophthalmology",
    "Dermatology",
    "Pediatrics",
    "Obstetrics",
    "Neurosurgery",
    "ENT",
];

/// Hits per query.
const QUERY_K: usize = 3;
/// Departments kept.
const DEPARTMENTS: usize = 3;

/// Specialties for every table symptom found in `symptoms`, deduplicated in
/// first-seen order.
pub fn specialties_for(symptoms: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (symptom, specialties) in SYMPTOM_SPECIALTIES {
        if !contains_ci(symptoms, symptom) {
            continue;
        }
        for s in *specialties {
            if !out.iter().any(|o| o == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

/// The query variants issued per specialty.
pub fn specialty_queries(specialty: &str) -> [String; 4] {
    [
        specialty.to_string(),
        format!("department {specialty}"),
        format!("doctor {specialty}"),
        fold_diacritics(specialty),
    ]
}

/// Map a free-text model answer onto the closed specialty list; an answer
/// naming none is used as-is.
fn parse_specialty_choice(answer: &str) -> Option<String> {
    let answer = answer.lines().next().unwrap_or_default().trim().trim_matches(['"', '.']);
    if answer.is_empty() {
        return None;
    }
    SPECIALTY_CHOICES
        .iter()
        .find(|s| contains_ci(answer, s))
        .map(|s| s.to_string())
        .or_else(|| Some(answer.to_string()))
}

fn department_name(doc: &ContextDocument) -> &str {
    &doc.attributes.department_name
}

impl ContextRetriever {
    /// Departments matching the symptoms in the dialogue, best first. `None`
    /// when the directory has no match or any collaborator fails.
    pub async fn doctor(&self, turn: &ConversationTurn) -> Option<String> {
        match self.try_doctor(turn).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "Doctor context retrieval failed");
                None
            }
        }
    }

    async fn try_doctor(&self, turn: &ConversationTurn) -> Result<Option<String>, Error> {
        let symptoms = extract_symptoms(&self.llm, &turn.dialogue(), ExtractionMode::Inclusive).await?;

        let mut specialties = specialties_for(&symptoms);
        if specialties.is_empty() {
            let answer = self.llm.complete(&specialty_prompt(&symptoms)).await?;
            specialties.extend(parse_specialty_choice(&answer));
        }
        info!(symptoms = %symptoms, specialties = ?specialties, "Candidate specialties");
        if specialties.is_empty() {
            return Ok(None);
        }

        let mut queries: Vec<String> = specialties.iter().flat_map(|s| specialty_queries(s)).collect();
        if !symptoms.trim().is_empty() {
            queries.push(symptoms.clone());
        }
        let results = self
            .search_all(&queries, QUERY_K, Some(DocumentCategory::DoctorDirectory))
            .await?;

        let scored: Vec<ScoredCandidate> = results
            .into_iter()
            .flatten()
            .map(|doc| {
                let fused = fuse_department(&doc, &specialties, &symptoms);
                ScoredCandidate::new(doc, fused)
            })
            .collect();
        let departments = dedup_max(scored, department_name, DEPARTMENTS);

        for d in &departments {
            debug!(
                department = %d.document.attributes.department_name,
                similarity = d.raw_similarity,
                fused = d.fused_score,
                "Ranked department"
            );
        }
        info!(departments = departments.len(), "Doctor context retrieved");
        if departments.is_empty() {
            return Ok(None);
        }

        let sections: Vec<String> = departments
            .iter()
            .map(|c| {
                let attrs = &c.document.attributes;
                let specialty = if attrs.specialty_name.is_empty() { "N/A" } else { &attrs.specialty_name };
                let header = format!("{} - {specialty}", attrs.department_name.to_uppercase());
                section(&header, &c.document.text)
            })
            .collect();
        Ok(Some(titled_block("DOCTOR INFORMATION", &sections)))
    }
}

fn specialty_prompt(symptoms: &str) -> String {
    format!(
        "Symptoms: {symptoms}\n\n\
         Choose the matching specialty from this list:\n\
         {}\n\n\
         Reply with ONLY the specialty name:",
        SPECIALTY_CHOICES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionClient;
    use crate::test_helpers::{ScriptedIndex, ScriptedReply, SequentialMockProvider, department_doc};
    use medroute_core::error::ProviderError;
    use std::sync::Arc;

    fn retriever(index: Arc<ScriptedIndex>, provider: Arc<SequentialMockProvider>) -> ContextRetriever {
        let llm = CompletionClient::new(provider, "m").with_max_retries(0);
        ContextRetriever::new(index, Arc::new(llm))
    }

    fn turn(message: &str) -> ConversationTurn {
        ConversationTurn::new(message, "", "")
    }

    #[test]
    fn table_is_many_to_many_and_deduplicated() {
        assert_eq!(specialties_for("chest pain"), vec!["Cardiology", "Internal Medicine"]);
        assert_eq!(
            specialties_for("Headache, chest pain, shortness of breath"),
            vec!["Internal Medicine", "Cardiology", "Endocrinology", "Intensive Care"]
        );
        assert!(specialties_for("tingling toes").is_empty());
    }

    #[test]
    fn query_variants_include_folded_form() {
        let q = specialty_queries("Tiêu hóa");
        assert_eq!(q[0], "Tiêu hóa");
        assert_eq!(q[1], "department Tiêu hóa");
        assert_eq!(q[2], "doctor Tiêu hóa");
        assert_eq!(q[3], "tieu hoa");
    }

    #[test]
    fn specialty_choice_parsing() {
        assert_eq!(parse_specialty_choice("Dermatology").as_deref(), Some("Dermatology"));
        assert_eq!(parse_specialty_choice("\"gastroenterology.\"").as_deref(), Some("Gastroenterology"));
        assert_eq!(parse_specialty_choice("ENT\nbecause...").as_deref(), Some("ENT"));
        assert_eq!(parse_specialty_choice("Rheumatology").as_deref(), Some("Rheumatology"));
        assert_eq!(parse_specialty_choice("  "), None);
    }

    #[tokio::test]
    async fn departments_ranked_by_fused_score() {
        let cardio = department_doc("Cardiology Department", "Cardiology", "Dr. Heart, MD", 0.40);
        let internal = department_doc("General Ward", "Internal Medicine", "Dr. Gen", 0.55);
        let index = Arc::new(
            ScriptedIndex::new()
                .on("Cardiology", vec![cardio.clone()])
                .on("department Cardiology", vec![cardio.clone(), internal.clone()])
                .on("Internal Medicine", vec![internal.clone()]),
        );
        let provider = Arc::new(SequentialMockProvider::texts(&["chest pain"]));
        let r = retriever(index.clone(), provider.clone());

        let block = r.doctor(&turn("I have chest pain")).await.unwrap();
        assert!(block.starts_with("DOCTOR INFORMATION:"));
        let cardio_at = block.find("CARDIOLOGY DEPARTMENT - Cardiology").unwrap();
        let ward_at = block.find("GENERAL WARD - Internal Medicine").unwrap();
        // 0.40 + 0.2 + 0.1 beats 0.55 + 0.1
        assert!(cardio_at < ward_at);
        assert_eq!(provider.call_count(), 1, "table hit needs no specialty call");

        let queries = index.queries();
        // two specialties × four variants + the raw symptom text
        assert_eq!(queries.len(), 9);
        assert_eq!(queries[8].query, "chest pain");
        assert!(queries.iter().all(|q| q.k == 3 && q.category == Some(DocumentCategory::DoctorDirectory)));
    }

    #[tokio::test]
    async fn unknown_symptom_asks_for_a_specialty() {
        let derm = department_doc("Skin Clinic", "Dermatology", "Dr. Skin", 0.5);
        let index = Arc::new(ScriptedIndex::new().on("Dermatology", vec![derm]));
        let provider = Arc::new(SequentialMockProvider::texts(&["peeling skin", "Dermatology"]));
        let r = retriever(index, provider.clone());

        let block = r.doctor(&turn("my skin is peeling")).await.unwrap();
        assert!(block.contains("SKIN CLINIC - Dermatology"));
        assert!(provider.prompts()[1].contains("Neurosurgery"));
    }

    #[tokio::test]
    async fn empty_directory_is_none() {
        let provider = Arc::new(SequentialMockProvider::texts(&["cough"]));
        let r = retriever(Arc::new(ScriptedIndex::new()), provider);
        assert!(r.doctor(&turn("I have a cough")).await.is_none());
    }

    #[tokio::test]
    async fn model_failure_is_none() {
        let provider = Arc::new(SequentialMockProvider::new(vec![ScriptedReply::Error(
            ProviderError::RateLimited { retry_after_secs: 1 },
        )]));
        let index = Arc::new(ScriptedIndex::new());
        assert!(retriever(index.clone(), provider).doctor(&turn("I have a cough")).await.is_none());
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn index_failure_is_none() {
        let provider = Arc::new(SequentialMockProvider::texts(&["rash"]));
        let r = retriever(Arc::new(ScriptedIndex::failing()), provider);
        assert!(r.doctor(&turn("I have a rash")).await.is_none());
    }
}
