//! Context retrieval.
//!
//! Three strategies share one skeleton: issue one or more semantic queries,
//! fuse similarity with keyword bonuses, deduplicate by a natural key, and
//! render the survivors as a text block for the prompt.
//!
//! - [`ContextRetriever::medical`]: background on the user's message
//! - [`ContextRetriever::medicine`]: symptom → medicine, model-adjudicated
//! - [`ContextRetriever::doctor`]: symptom → specialty → department
//!
//! No strategy ever returns an error. Index or model failures are logged and
//! the attempt yields `None`.

pub mod doctor;
pub mod extract;
pub mod medical;
pub mod medicine;
pub mod scoring;

use std::sync::Arc;

use futures::future::join_all;
use medroute_core::error::IndexError;
use medroute_core::index::{ContextDocument, DocumentCategory, SemanticIndex, enforce_category};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::CompletionClient;

pub use scoring::ScoredCandidate;

/// Separator line used around section headers.
pub(crate) const RULE: &str = "============================================================";

/// Retrieved text blocks, one slot per strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine: Option<String>,
}

/// Runs the three retrieval strategies against one index and one model.
pub struct ContextRetriever {
    index: Arc<dyn SemanticIndex>,
    llm: Arc<CompletionClient>,
    top_k: usize,
}

impl ContextRetriever {
    /// `top_k` defaults to 3 and only applies to medical background.
    pub fn new(index: Arc<dyn SemanticIndex>, llm: Arc<CompletionClient>) -> Self {
        Self {
            index,
            llm,
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// One index query under the client timeout. Hits outside `category`
    /// are dropped.
    async fn search(
        &self,
        query: &str,
        k: usize,
        category: Option<DocumentCategory>,
    ) -> Result<Vec<ContextDocument>, IndexError> {
        let timeout = self.llm.timeout();
        let hits = tokio::time::timeout(timeout, self.index.search(query, k, category))
            .await
            .map_err(|_| IndexError::Timeout(timeout.as_secs()))??;
        debug!(query, k, category = ?category, hits = hits.len(), index = self.index.name(), "Index query");
        Ok(enforce_category(hits, category))
    }

    /// Run `queries` concurrently. Results come back in query order; the
    /// first failure fails the batch.
    async fn search_all(
        &self,
        queries: &[String],
        k: usize,
        category: Option<DocumentCategory>,
    ) -> Result<Vec<Vec<ContextDocument>>, IndexError> {
        join_all(queries.iter().map(|q| self.search(q, k, category)))
            .await
            .into_iter()
            .collect()
    }
}

/// A header bracketed by rules, then the body.
pub(crate) fn section(header: &str, body: &str) -> String {
    format!("{RULE}\n{header}\n{RULE}\n{body}")
}

/// A titled block of sections, closed by a rule.
pub(crate) fn titled_block(title: &str, sections: &[String]) -> String {
    format!("{title}:\n\n{}\n\n{RULE}\n", sections.join("\n\n"))
}
