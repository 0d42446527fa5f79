//! Score fusion and natural-key deduplication.

use std::collections::HashMap;

use medroute_core::index::ContextDocument;

/// Keyword in a medicine's indications.
pub const INDICATION_BONUS: f32 = 0.5;
/// Keyword in a medicine's body text.
pub const MEDICINE_BODY_BONUS: f32 = 0.2;
/// Specialty in a department's name.
pub const DEPARTMENT_NAME_BONUS: f32 = 0.2;
/// Specialty in a department's specialty field.
pub const SPECIALTY_FIELD_BONUS: f32 = 0.1;
/// Full symptom text in a department's body text.
pub const DEPARTMENT_BODY_BONUS: f32 = 0.05;

/// A retrieval hit with its fused score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub document: ContextDocument,
    pub fused_score: f32,
    pub raw_similarity: f32,
}

impl ScoredCandidate {
    pub fn new(document: ContextDocument, fused_score: f32) -> Self {
        let raw_similarity = document.score;
        Self {
            document,
            fused_score,
            raw_similarity,
        }
    }
}

/// Case-insensitive containment. An empty needle never matches.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

/// `bonus` when `hit` holds, else nothing.
pub fn bonus(hit: bool, bonus: f32) -> f32 {
    if hit { bonus } else { 0.0 }
}

/// Fused score of a medicine hit retrieved for `keyword`.
pub fn fuse_medicine(doc: &ContextDocument, keyword: &str) -> f32 {
    doc.score
        + bonus(contains_ci(&doc.attributes.indications, keyword), INDICATION_BONUS)
        + bonus(contains_ci(&doc.text, keyword), MEDICINE_BODY_BONUS)
}

/// Fused score of a clinician-directory hit. Every candidate specialty
/// contributes its own bonuses.
pub fn fuse_department(doc: &ContextDocument, specialties: &[String], symptoms_text: &str) -> f32 {
    let attrs = &doc.attributes;
    let specialty_bonus: f32 = specialties
        .iter()
        .map(|s| {
            bonus(contains_ci(&attrs.department_name, s), DEPARTMENT_NAME_BONUS)
                + bonus(contains_ci(&attrs.specialty_name, s), SPECIALTY_FIELD_BONUS)
        })
        .sum();
    doc.score + specialty_bonus + bonus(contains_ci(&doc.text, symptoms_text), DEPARTMENT_BODY_BONUS)
}

/// Keep one candidate per natural key, the one with the highest fused score,
/// then sort best first and keep `limit`.
///
/// Candidates without a key are dropped. On equal fused scores the earlier
/// candidate is kept, and equal-scored keys keep first-seen order.
pub fn dedup_max<F>(candidates: Vec<ScoredCandidate>, key: F, limit: usize) -> Vec<ScoredCandidate>
where
    F: Fn(&ContextDocument) -> &str,
{
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, ScoredCandidate> = HashMap::new();

    for candidate in candidates {
        let k = key(&candidate.document).trim().to_string();
        if k.is_empty() {
            continue;
        }
        match best.get(&k) {
            Some(existing) if existing.fused_score >= candidate.fused_score => {}
            Some(_) => {
                best.insert(k, candidate);
            }
            None => {
                order.push(k.clone());
                best.insert(k, candidate);
            }
        }
    }

    let mut kept: Vec<ScoredCandidate> = order.into_iter().filter_map(|k| best.remove(&k)).collect();
    kept.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(limit);
    kept
}
