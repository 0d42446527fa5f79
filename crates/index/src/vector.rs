//! Vector similarity and ranking utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity over dense embeddings
//! - Lexical similarity (cosine over term-frequency vectors), used when no
//!   embedding model is configured
//! - Top-k ranking of scored documents

use std::collections::HashMap;

use medroute_core::index::{ContextDocument, DocumentCategory};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Lower-cased alphanumeric tokens. Non-ASCII letters are kept as-is so
/// accented text still tokenizes.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    let mut tf = HashMap::new();
    for token in tokens {
        *tf.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity between the term-frequency vectors of two texts.
///
/// Always in [0, 1]; 0.0 when either side has no tokens.
pub fn lexical_similarity(query: &str, document: &str) -> f32 {
    let q_tokens = tokenize(query);
    let d_tokens = tokenize(document);
    if q_tokens.is_empty() || d_tokens.is_empty() {
        return 0.0;
    }

    let q = term_frequencies(&q_tokens);
    let d = term_frequencies(&d_tokens);

    let dot: f64 = q
        .iter()
        .filter_map(|(term, qw)| d.get(term).map(|dw| qw * dw))
        .sum();
    let norm_q: f64 = q.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_d: f64 = d.values().map(|w| w * w).sum::<f64>().sqrt();

    if norm_q * norm_d < 1e-10 {
        return 0.0;
    }
    (dot / (norm_q * norm_d)) as f32
}

/// Whether `doc` passes an optional category filter.
pub fn in_category(doc: &ContextDocument, category: Option<DocumentCategory>) -> bool {
    category.is_none_or(|c| doc.category == c)
}

/// Return the `k` best scored documents, highest similarity first, with
/// `score` set on each clone.
///
/// Ties keep input order so results are deterministic.
pub fn rank_documents<'a>(
    scored: impl IntoIterator<Item = (&'a ContextDocument, f32)>,
    k: usize,
) -> Vec<ContextDocument> {
    let mut scored: Vec<ContextDocument> = scored
        .into_iter()
        .map(|(doc, sim)| {
            let mut hit = doc.clone();
            hit.score = sim;
            hit
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str, category: DocumentCategory) -> ContextDocument {
        ContextDocument::new(id, text, category, Default::default())
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("Acute Diarrhea, chronic-diarrhea"), vec![
            "acute", "diarrhea", "chronic", "diarrhea"
        ]);
        assert_eq!(tokenize("Đau đầu"), vec!["đau", "đầu"]);
    }

    #[test]
    fn lexical_similarity_bounds() {
        assert!((lexical_similarity("diarrhea", "diarrhea") - 1.0).abs() < 1e-6);
        assert_eq!(lexical_similarity("diarrhea", "headache relief"), 0.0);
        assert_eq!(lexical_similarity("", "anything"), 0.0);

        let partial = lexical_similarity("medicine for diarrhea", "Loperamide treats diarrhea");
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn rank_filters_sorts_and_truncates() {
        let docs = vec![
            doc("a", "fever", DocumentCategory::Medicine),
            doc("b", "fever fever", DocumentCategory::DoctorDirectory),
            doc("c", "fever and cough", DocumentCategory::Medicine),
            doc("d", "rash", DocumentCategory::Medicine),
        ];

        let ranked = rank_documents(
            docs.iter()
                .filter(|d| in_category(d, Some(DocumentCategory::Medicine)))
                .map(|d| (d, lexical_similarity("fever", &d.text))),
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "c");
        assert!(ranked.iter().all(|d| d.category == DocumentCategory::Medicine));
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn rank_ties_keep_input_order() {
        let docs = vec![doc("a", "x", DocumentCategory::Generic), doc("b", "y", DocumentCategory::Generic)];
        let ranked = rank_documents(docs.iter().map(|d| (d, 0.5)), 10);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "b");
        assert!(in_category(&docs[0], None));
    }
}
