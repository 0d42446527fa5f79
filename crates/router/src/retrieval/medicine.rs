//! Medicine retrieval: symptom phrases → candidate medicines → adjudication.

use medroute_core::error::Error;
use medroute_core::index::{ContextDocument, DocumentCategory};
use medroute_core::message::ConversationTurn;
use tracing::{debug, info, warn};

use super::extract::{ExtractionMode, extract_symptoms, split_phrases, validate_phrases};
use super::scoring::{ScoredCandidate, dedup_max, fuse_medicine};
use super::{ContextRetriever, RULE, section, titled_block};
use crate::parse::ADJUDICATION_VERDICT;

/// Bare medicine names that trigger a direct lookup instead of a symptom search.
pub const MEDICINE_GAZETTEER: &[&str] = &["paracetamol", "ibuprofen", "omeprazole", "cetirizine", "loperamide"];

/// Hits per query variant.
const VARIANT_K: usize = 5;
/// Candidates kept after fusion, before adjudication.
const CANDIDATES: usize = 5;
/// Candidates kept after adjudication.
const ACCEPTED: usize = 3;
/// Hits requested by a name lookup.
const LOOKUP_K: usize = 3;

const BLOCK_TITLE: &str = "MEDICINE INFORMATION";

/// The four query variants issued per symptom phrase.
pub fn medicine_queries(phrase: &str) -> [String; 4] {
    [
        phrase.to_string(),
        format!("medicine for {phrase}"),
        format!("treatment for {phrase}"),
        format!("relief for {phrase}"),
    ]
}

fn medicine_name(doc: &ContextDocument) -> &str {
    &doc.attributes.name
}

impl ContextRetriever {
    /// Medicines whose indications match the symptoms in the dialogue,
    /// each with its attribution block. `None` when no candidate survives
    /// adjudication or any collaborator fails.
    pub async fn medicine(&self, turn: &ConversationTurn) -> Option<String> {
        match self.try_medicine(turn).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "Medicine context retrieval failed");
                None
            }
        }
    }

    async fn try_medicine(&self, turn: &ConversationTurn) -> Result<Option<String>, Error> {
        let dialogue = turn.dialogue();
        let extracted = extract_symptoms(&self.llm, &dialogue, ExtractionMode::Literal).await?;
        let phrases = validate_phrases(split_phrases(&extracted), &dialogue);
        if phrases.is_empty() {
            info!("No validated symptoms, skipping medicine search");
            return Ok(None);
        }
        let symptoms = phrases.join(", ");
        info!(symptoms = %symptoms, "Searching medicines for symptoms");

        let symptoms_lower = symptoms.to_lowercase();
        for name in MEDICINE_GAZETTEER {
            if symptoms_lower.contains(name) {
                info!(medicine = name, "Medicine named directly, looking it up");
                if let Some(block) = self.lookup_medicine(name).await? {
                    return Ok(Some(block));
                }
            }
        }

        let candidates = self.rank_medicines(&phrases).await?;
        info!(candidates = candidates.len(), "Medicine candidates ranked");

        let accepted = self.adjudicate(&symptoms, candidates).await;
        info!(accepted = accepted.len(), "Medicines accepted after adjudication");
        if accepted.is_empty() {
            return Ok(None);
        }

        let sections: Vec<String> = accepted.iter().map(|c| format_medicine(&c.document)).collect();
        Ok(Some(titled_block(BLOCK_TITLE, &sections)))
    }

    /// Direct name lookup in the medicine category; the top hit only.
    pub async fn lookup_medicine(&self, name: &str) -> Result<Option<String>, Error> {
        let hits = self.search(name, LOOKUP_K, Some(DocumentCategory::Medicine)).await?;
        Ok(hits
            .first()
            .map(|doc| titled_block(BLOCK_TITLE, &[format_medicine(doc)])))
    }

    /// Multi-query fused ranking over the medicine category.
    async fn rank_medicines(&self, phrases: &[String]) -> Result<Vec<ScoredCandidate>, Error> {
        let queries: Vec<(usize, String)> = phrases
            .iter()
            .enumerate()
            .flat_map(|(i, p)| medicine_queries(p).into_iter().map(move |q| (i, q)))
            .collect();
        let texts: Vec<String> = queries.iter().map(|(_, q)| q.clone()).collect();
        let results = self.search_all(&texts, VARIANT_K, Some(DocumentCategory::Medicine)).await?;

        let mut scored = Vec::new();
        for ((phrase_idx, _), hits) in queries.iter().zip(results) {
            let keyword = &phrases[*phrase_idx];
            for doc in hits {
                let fused = fuse_medicine(&doc, keyword);
                debug!(
                    medicine = %doc.attributes.name,
                    keyword = %keyword,
                    similarity = doc.score,
                    fused,
                    "Scored medicine hit"
                );
                scored.push(ScoredCandidate::new(doc, fused));
            }
        }
        Ok(dedup_max(scored, medicine_name, CANDIDATES))
    }

    /// Ask the model, one candidate at a time in rank order, whether the
    /// indication directly matches. Stops once enough are accepted. A failed
    /// call skips that candidate.
    async fn adjudicate(&self, symptoms: &str, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let mut accepted = Vec::new();
        for candidate in candidates {
            if accepted.len() == ACCEPTED {
                break;
            }
            let attrs = &candidate.document.attributes;
            let prompt = adjudication_prompt(symptoms, &attrs.name, &attrs.category, &attrs.indications);
            match self.llm.complete(&prompt).await {
                Ok(answer) => {
                    let suitable = ADJUDICATION_VERDICT.parse(&answer);
                    info!(
                        medicine = %attrs.name,
                        fused = candidate.fused_score,
                        similarity = candidate.raw_similarity,
                        suitable,
                        "Adjudicated medicine"
                    );
                    if suitable {
                        accepted.push(candidate);
                    }
                }
                Err(e) => warn!(medicine = %attrs.name, error = %e, "Adjudication failed, skipping"),
            }
        }
        accepted
    }
}

/// A medicine section: name header, body, and the attribution fields
/// verbatim when any are present.
pub fn format_medicine(doc: &ContextDocument) -> String {
    let attrs = &doc.attributes;
    let header = if attrs.name.is_empty() {
        "MEDICINE".to_string()
    } else {
        attrs.name.to_uppercase()
    };
    let mut out = section(&header, &format!("\n{}", doc.text));

    if attrs.has_attribution() {
        out.push_str(&format!("\n\n{RULE}\nREFERENCES (MUST BE SHOWN)\n{RULE}\n"));
        if !attrs.source.is_empty() {
            out.push_str(&format!("Source: {}\n", attrs.source));
        }
        if !attrs.reference_url.is_empty() {
            out.push_str(&format!("Reference: {}\n", attrs.reference_url));
        }
        if !attrs.last_updated.is_empty() {
            out.push_str(&format!("Last updated: {}\n", attrs.last_updated));
        }
        out.push_str(RULE);
    }
    out
}

fn adjudication_prompt(symptoms: &str, name: &str, category: &str, indications: &str) -> String {
    format!(
        r#"You are a professional pharmacist. Decide whether the medicine DIRECTLY treats the symptoms.

PATIENT SYMPTOMS:
{symptoms}

MEDICINE UNDER REVIEW:
- Name: {name}
- Class: {category}
- Indications: {indications}

STRICT RULES:

Answer "SUITABLE" ONLY WHEN:
- The medicine's indications DIRECTLY match the symptoms
- Examples:
  + Symptom "diarrhea" + indications "Acute diarrhea, Chronic diarrhea" -> SUITABLE
  + Symptom "fever" + indications "Fever reduction, Pain relief" -> SUITABLE
  + Symptom "headache" + indications "Headache, Pain relief" -> SUITABLE

Answer "NOT SUITABLE" WHEN:
- The indications are NOT directly related
- Examples:
  + Symptom "diarrhea" + indications "Stomach ulcer, Heartburn" -> NOT SUITABLE
  + Symptom "fever" + indications "Acute diarrhea" -> NOT SUITABLE
  + Symptom "headache" + indications "Allergic rhinitis" -> NOT SUITABLE

QUESTION:
For the symptoms "{symptoms}", is "{name}" (indications: "{indications}") SUITABLE for direct treatment?

ANSWER WITH EXACTLY ONE OF:
- "SUITABLE"
- "NOT SUITABLE"

Answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionClient;
    use crate::test_helpers::{ScriptedIndex, ScriptedReply, SequentialMockProvider, medicine_doc};
    use medroute_core::error::ProviderError;
    use medroute_core::index::DocumentAttributes;
    use std::sync::Arc;

    fn retriever(index: Arc<ScriptedIndex>, provider: Arc<SequentialMockProvider>) -> ContextRetriever {
        let llm = CompletionClient::new(provider, "m").with_max_retries(0);
        ContextRetriever::new(index, Arc::new(llm))
    }

    fn turn(message: &str) -> ConversationTurn {
        ConversationTurn::new(message, "", "")
    }

    #[test]
    fn query_variants() {
        assert_eq!(
            medicine_queries("diarrhea"),
            ["diarrhea", "medicine for diarrhea", "treatment for diarrhea", "relief for diarrhea"]
                .map(String::from)
        );
    }

    #[tokio::test]
    async fn hallucinated_symptoms_are_dropped_before_search() {
        let index = Arc::new(ScriptedIndex::new());
        let provider = Arc::new(SequentialMockProvider::texts(&["diarrhea, migraine"]));
        let r = retriever(index.clone(), provider);

        assert!(r.medicine(&turn("I have diarrhea")).await.is_none());

        let queries: Vec<String> = index.queries().into_iter().map(|q| q.query).collect();
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().all(|q| q.contains("diarrhea")));
        assert!(index.queries().iter().all(|q| q.category == Some(DocumentCategory::Medicine) && q.k == 5));
    }

    #[tokio::test]
    async fn no_traceable_symptom_skips_search() {
        let index = Arc::new(ScriptedIndex::new());
        let provider = Arc::new(SequentialMockProvider::texts(&["fever"]));
        let r = retriever(index.clone(), provider);
        assert!(r.medicine(&turn("what medicine should I take?")).await.is_none());
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn indication_match_wins_ranking_and_survives_adjudication() {
        let lop = medicine_doc("Loperamide", "Acute diarrhea", "Loperamide slows the gut.", 0.30);
        let ome = medicine_doc("Omeprazole", "Heartburn", "Proton pump inhibitor.", 0.70);
        let index = Arc::new(
            ScriptedIndex::new()
                .on("diarrhea", vec![ome.clone(), lop.clone()])
                .on("medicine for diarrhea", vec![lop.clone()]),
        );
        // extraction, then one verdict per candidate in fused order
        let provider = Arc::new(SequentialMockProvider::texts(&["diarrhea", "SUITABLE", "NOT SUITABLE"]));
        let r = retriever(index, provider.clone());

        let block = r.medicine(&turn("I have diarrhea")).await.unwrap();
        assert!(block.contains("LOPERAMIDE"));
        assert!(!block.contains("OMEPRAZOLE"));

        // Loperamide: 0.30 + 0.5 ranks above Omeprazole's bare 0.70.
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("\"Loperamide\""));
        assert!(prompts[1].contains("Acute diarrhea"));
        assert!(prompts[2].contains("\"Omeprazole\""));
    }

    #[tokio::test]
    async fn adjudication_caps_at_three_and_skips_failures() {
        let docs: Vec<_> = (0..5)
            .map(|i| medicine_doc(&format!("Med{i}"), "fever", "", 0.9 - i as f32 * 0.1))
            .collect();
        let index = Arc::new(ScriptedIndex::new().on("fever", docs));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            ScriptedReply::Text("fever".into()),
            ScriptedReply::Text("SUITABLE".into()),
            ScriptedReply::Error(ProviderError::Network("flaky".into())),
            ScriptedReply::Text("UNSUITABLE".into()),
            ScriptedReply::Text("SUITABLE".into()),
            ScriptedReply::Text("SUITABLE".into()),
        ]));
        let r = retriever(index, provider.clone());

        let block = r.medicine(&turn("I have a fever")).await.unwrap();
        assert!(block.contains("MED0"));
        assert!(!block.contains("MED1"));
        assert!(!block.contains("MED2"));
        assert!(block.contains("MED3"));
        assert!(block.contains("MED4"));
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test]
    async fn nothing_accepted_is_none() {
        let index = Arc::new(ScriptedIndex::new().on("rash", vec![medicine_doc("Cetirax", "Allergy", "", 0.5)]));
        let provider = Arc::new(SequentialMockProvider::texts(&["rash", "NOT SUITABLE"]));
        assert!(retriever(index, provider).medicine(&turn("I have a rash")).await.is_none());
    }

    #[tokio::test]
    async fn named_medicine_short_circuits_to_lookup() {
        let para = medicine_doc("Paracetamol", "Fever, Headache", "Paracetamol 500mg tablets.", 0.8);
        let index = Arc::new(ScriptedIndex::new().on("paracetamol", vec![para]));
        let provider = Arc::new(SequentialMockProvider::texts(&["paracetamol"]));
        let r = retriever(index.clone(), provider.clone());

        let block = r.medicine(&turn("can I take Paracetamol?")).await.unwrap();
        assert!(block.contains("PARACETAMOL"));
        assert_eq!(provider.call_count(), 1, "no adjudication on direct lookup");

        let queries = index.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].k, 3);
        assert_eq!(queries[0].category, Some(DocumentCategory::Medicine));
    }

    #[tokio::test]
    async fn index_failure_is_none() {
        let provider = Arc::new(SequentialMockProvider::texts(&["cough"]));
        let r = retriever(Arc::new(ScriptedIndex::failing()), provider);
        assert!(r.medicine(&turn("I have a cough")).await.is_none());
    }

    #[tokio::test]
    async fn extraction_failure_is_none() {
        let provider = Arc::new(SequentialMockProvider::new(vec![ScriptedReply::Error(
            ProviderError::Timeout("slow".into()),
        )]));
        let index = Arc::new(ScriptedIndex::new());
        assert!(retriever(index.clone(), provider).medicine(&turn("I have a cough")).await.is_none());
        assert!(index.queries().is_empty());
    }

    #[test]
    fn attribution_is_forwarded_verbatim() {
        let doc = ContextDocument::new(
            "m1",
            "Loperamide 2mg capsules.",
            DocumentCategory::Medicine,
            DocumentAttributes {
                name: "Loperamide".into(),
                source: "National Drug Formulary, 3rd ed.".into(),
                reference_url: "https://example.org/drugs/loperamide?rev=7".into(),
                last_updated: "2024-03-01".into(),
                ..Default::default()
            },
        );
        let text = format_medicine(&doc);
        assert!(text.contains("Source: National Drug Formulary, 3rd ed.\n"));
        assert!(text.contains("Reference: https://example.org/drugs/loperamide?rev=7\n"));
        assert!(text.contains("Last updated: 2024-03-01\n"));
        assert!(text.contains("REFERENCES (MUST BE SHOWN)"));
    }

    #[test]
    fn missing_attribution_adds_no_reference_section() {
        let doc = medicine_doc("Cetirizine", "Allergy", "Antihistamine.", 0.5);
        let text = format_medicine(&doc);
        assert!(text.starts_with(&format!("{RULE}\nCETIRIZINE\n{RULE}\n")));
        assert!(!text.contains("REFERENCES"));
    }
}
