//! # MedRoute Core
//!
//! Domain types, traits, and error definitions for the MedRoute medical
//! dialogue router. This crate has **no framework dependencies**: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design
//!
//! The two external collaborators of the router, the language model and the
//! semantic index, are traits here. Implementations live in their own crates:
//! - `medroute-providers` implements [`Provider`]
//! - `medroute-index` implements [`SemanticIndex`]
//!
//! Tests swap both for scripted mocks.

pub mod error;
pub mod index;
pub mod intent;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, ProviderError, Result};
pub use index::{ContextDocument, DocumentAttributes, DocumentCategory, SemanticIndex};
pub use intent::Intent;
pub use message::{Conversation, ConversationTurn, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
