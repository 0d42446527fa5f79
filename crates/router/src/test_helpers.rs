//! Shared test helpers: a scripted provider and a scripted index.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use medroute_core::error::{IndexError, ProviderError};
use medroute_core::index::{
    ContextDocument, DocumentAttributes, DocumentCategory, SemanticIndex,
};
use medroute_core::message::{Message, Role};
use medroute_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// One scripted provider outcome.
pub enum ScriptedReply {
    Text(String),
    Error(ProviderError),
    /// Never answers; exercises timeouts.
    Stall,
}

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` consumes the next reply. Panics if more calls are
/// made than replies provided. Every request is recorded.
pub struct SequentialMockProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| ScriptedReply::Text(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The user-role content of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.iter().rev().find(|m| m.role == Role::User))
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.requests.lock().unwrap().iter().map(|r| r.temperature).collect()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(make_text_response(&text)),
            Some(ScriptedReply::Error(e)) => Err(e),
            Some(ScriptedReply::Stall) => std::future::pending().await,
            None => panic!("SequentialMockProvider: no more responses (call #{call})"),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A recorded index call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub query: String,
    pub k: usize,
    pub category: Option<DocumentCategory>,
}

/// An index that answers exact queries from a script.
///
/// Unscripted queries return no hits. Scripted hits are truncated to `k`.
#[derive(Default)]
pub struct ScriptedIndex {
    hits: HashMap<String, Vec<ContextDocument>>,
    fail: bool,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index whose every search fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn on(mut self, query: &str, hits: Vec<ContextDocument>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SemanticIndex for ScriptedIndex {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        category: Option<DocumentCategory>,
    ) -> Result<Vec<ContextDocument>, IndexError> {
        self.queries.lock().unwrap().push(RecordedQuery {
            query: query.to_string(),
            k,
            category,
        });
        if self.fail {
            return Err(IndexError::QueryFailed("scripted failure".into()));
        }
        let mut hits = self.hits.get(query).cloned().unwrap_or_default();
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.hits.values().map(Vec::len).sum())
    }
}

/// A scored medicine document.
pub fn medicine_doc(name: &str, indications: &str, body: &str, score: f32) -> ContextDocument {
    let mut doc = ContextDocument::new(
        format!("medicines.json#{name}"),
        body,
        DocumentCategory::Medicine,
        DocumentAttributes {
            name: name.into(),
            indications: indications.into(),
            ..Default::default()
        },
    );
    doc.score = score;
    doc
}

/// A scored clinician-directory document.
pub fn department_doc(department: &str, specialty: &str, body: &str, score: f32) -> ContextDocument {
    let mut doc = ContextDocument::new(
        format!("medical_personnel.json#{department}"),
        body,
        DocumentCategory::DoctorDirectory,
        DocumentAttributes {
            department_name: department.into(),
            specialty_name: specialty.into(),
            ..Default::default()
        },
    );
    doc.score = score;
    doc
}

/// A scored symptom knowledge document.
pub fn symptom_doc(name: &str, body: &str, score: f32) -> ContextDocument {
    let mut doc = ContextDocument::new(
        format!("symptoms.json#{name}"),
        body,
        DocumentCategory::Symptom,
        DocumentAttributes {
            symptom_name: name.into(),
            ..Default::default()
        },
    );
    doc.score = score;
    doc
}
