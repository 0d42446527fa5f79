//! LLM Provider implementations for MedRoute.
//!
//! All providers implement the `medroute_core::Provider` trait.
//! `build_from_config` selects the endpoint from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
