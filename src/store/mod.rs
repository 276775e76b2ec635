//! Vector Store
//!
//! Immutable word-embedding table, cosine similarity, compact binary
//! cache, and the single load gate.

pub mod cache;
mod loader;
mod similarity;
mod vectors;

pub use loader::StoreLoader;
pub use similarity::{cosine_similarity, dot_product, magnitude};
pub use vectors::VectorStore;
