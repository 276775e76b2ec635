//! Ranking Module
//!
//! Top-K similarity ranking and guess evaluation over a store snapshot.

mod engine;
mod result;

pub use engine::{GuessOutcome, RankingEngine, DEFAULT_TOP_K};
pub use result::{lookup_rank, RankStatus, SimilarityResult};
