//! SemanticIndex trait: k-nearest-neighbor lookup over categorized documents.
//!
//! The index stores content chunks tagged with a `DocumentCategory` and
//! free-form attributes. The router only reads from it. Attributes arrive as
//! an untyped string map and are validated into `DocumentAttributes` at the
//! index-result boundary; missing fields default to empty strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::IndexError;

/// The category a document was ingested under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    #[serde(rename = "medicine")]
    Medicine,
    #[serde(rename = "doctor-directory")]
    DoctorDirectory,
    #[serde(rename = "symptom")]
    Symptom,
    #[serde(rename = "generic")]
    Generic,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Medicine => "medicine",
            DocumentCategory::DoctorDirectory => "doctor-directory",
            DocumentCategory::Symptom => "symptom",
            DocumentCategory::Generic => "generic",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "medicine" => Ok(DocumentCategory::Medicine),
            "doctor-directory" => Ok(DocumentCategory::DoctorDirectory),
            "symptom" => Ok(DocumentCategory::Symptom),
            "generic" => Ok(DocumentCategory::Generic),
            other => Err(IndexError::QueryFailed(format!("unknown category '{other}'"))),
        }
    }
}

/// Typed view over a document's metadata.
///
/// Every field defaults to the empty string; `extra` keeps attributes this
/// type does not name so nothing ingested is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAttributes {
    /// Medicine or item name
    #[serde(default)]
    pub name: String,
    /// Medicine class (e.g. "analgesic")
    #[serde(default)]
    pub category: String,
    /// Comma-joined indications, original casing
    #[serde(default)]
    pub indications: String,
    /// Clinician directory: department
    #[serde(default)]
    pub department_name: String,
    /// Clinician directory: specialty
    #[serde(default)]
    pub specialty_name: String,
    /// Symptom knowledge entries
    #[serde(default)]
    pub symptom_name: String,
    /// Attribution: source name
    #[serde(default)]
    pub source: String,
    /// Attribution: reference URL
    #[serde(default)]
    pub reference_url: String,
    /// Attribution: last-updated date, as ingested
    #[serde(default)]
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl DocumentAttributes {
    /// Build typed attributes from a raw metadata map.
    ///
    /// Accepts both camelCase and snake_case keys as well as the legacy
    /// `item_name`, `indications_text` and `specialty` keys.
    pub fn from_map(raw: &BTreeMap<String, String>) -> Self {
        let mut attrs = DocumentAttributes::default();
        for (key, value) in raw {
            let slot = match key.as_str() {
                "name" | "item_name" | "medicineName" | "medicine_name" => &mut attrs.name,
                "category" => &mut attrs.category,
                "indications" | "indications_text" => &mut attrs.indications,
                "departmentName" | "department_name" => &mut attrs.department_name,
                "specialtyName" | "specialty_name" | "specialty" => &mut attrs.specialty_name,
                "symptomName" | "symptom_name" => &mut attrs.symptom_name,
                "source" => &mut attrs.source,
                "referenceUrl" | "reference_url" => &mut attrs.reference_url,
                "lastUpdated" | "last_updated" => &mut attrs.last_updated,
                _ => {
                    attrs.extra.insert(key.clone(), value.clone());
                    continue;
                }
            };
            // First non-empty alias wins.
            if slot.is_empty() {
                *slot = value.clone();
            }
        }
        attrs
    }

    /// Whether any attribution field is present.
    pub fn has_attribution(&self) -> bool {
        !self.source.is_empty() || !self.reference_url.is_empty() || !self.last_updated.is_empty()
    }
}

/// A single hit returned by the semantic index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// Stable identifier (file + position)
    pub id: String,

    /// The document body
    pub text: String,

    /// The category the document was ingested under
    pub category: DocumentCategory,

    /// Similarity to the query, higher is more similar (set by search)
    #[serde(default)]
    pub score: f32,

    #[serde(default)]
    pub attributes: DocumentAttributes,
}

impl ContextDocument {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        category: DocumentCategory,
        attributes: DocumentAttributes,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category,
            score: 0.0,
            attributes,
        }
    }

    /// The most specific name field available, if any.
    pub fn display_name(&self) -> Option<&str> {
        let a = &self.attributes;
        [&a.symptom_name, &a.name, &a.department_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
    }
}

/// The core SemanticIndex trait.
///
/// Implementations must honor `category` as an exact-match filter.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return up to `k` documents most similar to `query`, best first.
    async fn search(
        &self,
        query: &str,
        k: usize,
        category: Option<DocumentCategory>,
    ) -> std::result::Result<Vec<ContextDocument>, IndexError>;

    /// Number of indexed documents.
    async fn count(&self) -> std::result::Result<usize, IndexError>;
}

/// Drop hits whose category does not match the filter they were retrieved
/// with. A filtered query must never hand back another category.
pub fn enforce_category(
    hits: Vec<ContextDocument>,
    category: Option<DocumentCategory>,
) -> Vec<ContextDocument> {
    let Some(expected) = category else {
        return hits;
    };
    hits.into_iter()
        .filter(|doc| {
            let keep = doc.category == expected;
            if !keep {
                warn!(
                    id = %doc.id,
                    expected = %expected,
                    actual = %doc.category,
                    "Index returned a hit outside the requested category, dropping"
                );
            }
            keep
        })
        .collect()
}
