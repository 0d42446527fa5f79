//! Semantic index implementations for MedRoute.

pub mod catalog;
pub mod in_memory;
pub mod vector;

pub use catalog::{ChunkOptions, chunk_text, load_catalog};
pub use in_memory::{Embedder, InMemoryIndex};
pub use vector::{cosine_similarity, lexical_similarity};
