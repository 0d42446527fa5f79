//! # MedRoute Router
//!
//! Routes one turn of a medical-assistance dialogue: classify the intent,
//! gate the doctor and medicine branches on symptom evidence, retrieve and
//! rank supporting context, and assemble guarded prompts for the answering
//! model.
//!
//! ```text
//! ConversationTurn → RoutingWorkflow ─→ IntentClassifier
//!                                     ├→ SymptomGate
//!                                     ├→ ContextRetriever (medical | doctor | medicine)
//!                                     └→ ResponseAssembler → RoutingResult
//! ```
//!
//! Every model call goes through [`CompletionClient`], which bounds it with a
//! timeout and a small retry budget. No component returns an error to the
//! workflow; failures are logged and degrade to safe fallbacks.

pub mod assembler;
pub mod intent;
pub mod llm;
pub mod normalize;
pub mod parse;
pub mod retrieval;
pub mod symptoms;
pub mod workflow;

#[cfg(test)]
mod test_helpers;

pub use assembler::{AssembledPrompt, ResponseAssembler};
pub use intent::IntentClassifier;
pub use llm::CompletionClient;
pub use retrieval::{ContextRetriever, RetrievedContext, ScoredCandidate};
pub use symptoms::SymptomGate;
pub use workflow::{RoutingResult, RoutingState, RoutingWorkflow, WorkflowState, next_state};
