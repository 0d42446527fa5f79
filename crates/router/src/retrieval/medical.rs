//! Medical-background retrieval.

use medroute_core::error::IndexError;
use tracing::{info, warn};

use super::{ContextRetriever, section, titled_block};

impl ContextRetriever {
    /// Unfiltered top-k search on `query`. Each hit is headed by its most
    /// specific name. `None` when nothing is found or the index fails.
    pub async fn medical(&self, query: &str) -> Option<String> {
        match self.try_medical(query).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "Medical context retrieval failed");
                None
            }
        }
    }

    async fn try_medical(&self, query: &str) -> Result<Option<String>, IndexError> {
        let hits = self.search(query, self.top_k, None).await?;
        info!(hits = hits.len(), "Medical context retrieved");
        if hits.is_empty() {
            return Ok(None);
        }

        let sections: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let header = doc
                    .display_name()
                    .map(str::to_uppercase)
                    .unwrap_or_else(|| format!("DOCUMENT {}", i + 1));
                section(&header, &doc.text)
            })
            .collect();
        Ok(Some(titled_block("MEDICAL INFORMATION", &sections)))
    }
}
