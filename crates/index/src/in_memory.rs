//! In-memory semantic index.
//!
//! Holds every document in a Vec behind a `RwLock`. With an embedder
//! configured, documents and queries are embedded through the provider and
//! ranked by cosine similarity; without one, a lexical term-frequency cosine
//! is used instead. Both scores live in a comparable [0, 1]-ish scale.

use std::sync::Arc;

use async_trait::async_trait;
use medroute_core::error::IndexError;
use medroute_core::index::{ContextDocument, DocumentCategory, SemanticIndex, enforce_category};
use medroute_core::provider::{EmbeddingRequest, Provider};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::vector::{cosine_similarity, in_category, lexical_similarity, rank_documents};

/// Texts per embedding request during bulk insert.
const EMBED_BATCH: usize = 64;

/// Embedding source for the index.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, IndexError> {
        let expected = inputs.len();
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != expected {
            return Err(IndexError::EmbeddingFailed(format!(
                "expected {expected} embeddings, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }
}

struct IndexedDocument {
    document: ContextDocument,
    embedding: Option<Vec<f32>>,
}

/// An index that keeps all documents in memory.
pub struct InMemoryIndex {
    entries: Arc<RwLock<Vec<IndexedDocument>>>,
    embedder: Option<Embedder>,
}

impl InMemoryIndex {
    /// A lexical-only index.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder: None,
        }
    }

    /// An index that embeds documents and queries through `embedder`.
    pub fn with_embedder(embedder: Embedder) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder: Some(embedder),
        }
    }

    /// Add documents, embedding them in batches when an embedder is set.
    pub async fn insert_many(&self, documents: Vec<ContextDocument>) -> Result<usize, IndexError> {
        for doc in &documents {
            if doc.text.trim().is_empty() {
                return Err(IndexError::InvalidDocument {
                    id: doc.id.clone(),
                    reason: "empty text".into(),
                });
            }
        }

        let mut indexed = Vec::with_capacity(documents.len());
        match &self.embedder {
            Some(embedder) => {
                for batch in documents.chunks(EMBED_BATCH) {
                    let texts = batch.iter().map(|d| d.text.clone()).collect();
                    let vectors = embedder.embed(texts).await?;
                    indexed.extend(batch.iter().cloned().zip(vectors).map(|(document, v)| {
                        IndexedDocument {
                            document,
                            embedding: Some(v),
                        }
                    }));
                }
            }
            None => indexed.extend(documents.into_iter().map(|document| IndexedDocument {
                document,
                embedding: None,
            })),
        }

        let added = indexed.len();
        self.entries.write().await.extend(indexed);
        info!(added, embedded = self.embedder.is_some(), "Indexed documents");
        Ok(added)
    }

    /// Per-category document counts.
    pub async fn category_counts(&self) -> Vec<(DocumentCategory, usize)> {
        let entries = self.entries.read().await;
        [
            DocumentCategory::Medicine,
            DocumentCategory::DoctorDirectory,
            DocumentCategory::Symptom,
            DocumentCategory::Generic,
        ]
        .into_iter()
        .map(|c| (c, entries.iter().filter(|e| e.document.category == c).count()))
        .collect()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        category: Option<DocumentCategory>,
    ) -> Result<Vec<ContextDocument>, IndexError> {
        let query_embedding = match &self.embedder {
            Some(embedder) => embedder
                .embed(vec![query.to_string()])
                .await?
                .into_iter()
                .next(),
            None => None,
        };

        let entries = self.entries.read().await;
        let candidates = entries.iter().filter(|e| in_category(&e.document, category));
        let hits = match &query_embedding {
            Some(q) => rank_documents(
                candidates.filter_map(|e| {
                    let emb = e.embedding.as_deref()?;
                    Some((&e.document, cosine_similarity(emb, q)))
                }),
                k,
            ),
            None => rank_documents(
                candidates.map(|e| (&e.document, lexical_similarity(query, &e.document.text))),
                k,
            ),
        };

        debug!(query, k, category = ?category, hits = hits.len(), "Index search");
        Ok(enforce_category(hits, category))
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().await.len())
    }
}
