//! The routing state machine.
//!
//! ```text
//! START → CLASSIFY_INTENT ─┬─ medical ──────→ GET_MEDICAL_CONTEXT ──┐
//!                          ├─ doctor/medicine → CHECK_SYMPTOMS ─┬────┤ (no symptoms)
//!                          │                  ├→ GET_DOCTOR_CONTEXT ┤
//!                          │                  └→ GET_MEDICINE_CONTEXT┤
//!                          └─ general ────────────────────────────→ BUILD_RESPONSE → END
//! ```
//!
//! Node bodies do the I/O; [`next_state`] is pure. The graph is acyclic and
//! every run ends in `BUILD_RESPONSE → END`.

use std::fmt;
use std::sync::Arc;

use medroute_config::AppConfig;
use medroute_core::{ConversationTurn, Intent, Provider, SemanticIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembler::{AssembledPrompt, ResponseAssembler};
use crate::intent::IntentClassifier;
use crate::llm::CompletionClient;
use crate::retrieval::{ContextRetriever, RetrievedContext};
use crate::symptoms::SymptomGate;

/// Workflow nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Start,
    ClassifyIntent,
    GetMedicalContext,
    CheckSymptoms,
    GetDoctorContext,
    GetMedicineContext,
    BuildResponse,
    End,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Start => "START",
            WorkflowState::ClassifyIntent => "CLASSIFY_INTENT",
            WorkflowState::GetMedicalContext => "GET_MEDICAL_CONTEXT",
            WorkflowState::CheckSymptoms => "CHECK_SYMPTOMS",
            WorkflowState::GetDoctorContext => "GET_DOCTOR_CONTEXT",
            WorkflowState::GetMedicineContext => "GET_MEDICINE_CONTEXT",
            WorkflowState::BuildResponse => "BUILD_RESPONSE",
            WorkflowState::End => "END",
        };
        f.write_str(s)
    }
}

/// The per-turn working record. Created fresh for every `route` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingState {
    pub intent: Intent,
    /// `None` until the symptom gate has run
    pub has_symptoms: Option<bool>,
    pub context: RetrievedContext,
    pub prompt: AssembledPrompt,
    /// Nodes entered, in order
    pub visited: Vec<WorkflowState>,
}

/// The outcome of one routing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub intent: Intent,
    pub used_context: bool,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl From<RoutingState> for RoutingResult {
    fn from(state: RoutingState) -> Self {
        Self {
            intent: state.intent,
            used_context: state.prompt.used_context,
            system_prompt: state.prompt.system_prompt,
            user_prompt: state.prompt.user_prompt,
        }
    }
}

/// The transition function.
pub fn next_state(current: WorkflowState, state: &RoutingState) -> WorkflowState {
    use WorkflowState::*;

    match current {
        Start => ClassifyIntent,
        ClassifyIntent if state.intent.requires_symptoms() => CheckSymptoms,
        ClassifyIntent => match state.intent {
            Intent::MedicalConsultation => GetMedicalContext,
            _ => BuildResponse,
        },
        CheckSymptoms => match (state.has_symptoms, state.intent) {
            (Some(true), Intent::DoctorRecommendation) => GetDoctorContext,
            (Some(true), Intent::MedicineInquiry) => GetMedicineContext,
            _ => BuildResponse,
        },
        GetMedicalContext | GetDoctorContext | GetMedicineContext => BuildResponse,
        BuildResponse | End => End,
    }
}

/// Sequences classification, gating, retrieval and assembly for one turn.
pub struct RoutingWorkflow {
    classifier: IntentClassifier,
    gate: SymptomGate,
    retriever: ContextRetriever,
    assembler: ResponseAssembler,
}

impl RoutingWorkflow {
    pub fn new(
        classifier: IntentClassifier,
        gate: SymptomGate,
        retriever: ContextRetriever,
        assembler: ResponseAssembler,
    ) -> Self {
        Self {
            classifier,
            gate,
            retriever,
            assembler,
        }
    }

    /// Wire every component to one model client and one index.
    pub fn from_config(provider: Arc<dyn Provider>, index: Arc<dyn SemanticIndex>, config: &AppConfig) -> Self {
        let llm = Arc::new(CompletionClient::from_config(provider, &config.model));
        Self::new(
            IntentClassifier::new(llm.clone()),
            SymptomGate::new(llm.clone()),
            ContextRetriever::new(index, llm).with_top_k(config.retrieval.top_k),
            ResponseAssembler::new(),
        )
    }

    /// Route one turn. Never fails: every collaborator error has already
    /// degraded to a fallback by the time the prompts are built.
    pub async fn route(&self, turn: &ConversationTurn) -> RoutingResult {
        let state = self.run(turn).await;
        info!(
            intent = %state.intent,
            has_symptoms = ?state.has_symptoms,
            used_context = state.prompt.used_context,
            "Turn routed"
        );
        state.into()
    }

    /// Run the state machine to `END` and return the full working record.
    pub async fn run(&self, turn: &ConversationTurn) -> RoutingState {
        let mut state = RoutingState::default();
        let mut current = WorkflowState::Start;

        loop {
            state.visited.push(current);
            self.enter(current, &mut state, turn).await;
            if current == WorkflowState::End {
                break;
            }
            let next = next_state(current, &state);
            debug!(from = %current, to = %next, "Workflow transition");
            current = next;
        }
        state
    }

    async fn enter(&self, node: WorkflowState, state: &mut RoutingState, turn: &ConversationTurn) {
        match node {
            WorkflowState::Start | WorkflowState::End => {}
            WorkflowState::ClassifyIntent => {
                state.intent = self.classifier.classify(&turn.user_message).await;
            }
            WorkflowState::GetMedicalContext => {
                state.context.medical = self.retriever.medical(&turn.user_message).await;
            }
            WorkflowState::CheckSymptoms => {
                state.has_symptoms = Some(self.gate.has_symptoms(&turn.symptom_evidence()).await);
            }
            WorkflowState::GetDoctorContext => {
                let evidence = turn.symptom_evidence();
                let (background, doctors) =
                    tokio::join!(self.retriever.medical(&evidence), self.retriever.doctor(turn));
                state.context.medical = background;
                state.context.doctor = doctors;
            }
            WorkflowState::GetMedicineContext => {
                state.context.medicine = self.retriever.medicine(turn).await;
            }
            WorkflowState::BuildResponse => {
                state.prompt = self
                    .assembler
                    .assemble(state.intent, state.has_symptoms, &state.context, turn);
            }
        }
    }
}
