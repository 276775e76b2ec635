//! WORDSIM - In-Memory Word-Embedding Similarity Ranking Engine
//!
//! Loads a large static word-embedding table once, keeps it resident
//! against OS paging pressure, and serves low-latency top-100 similarity
//! rankings against a dynamically supplied candidate word set.

pub mod config;
pub mod error;
pub mod keeper;
pub mod ranking;
pub mod store;

pub use config::Config;
pub use error::{Result, WordSimError};
pub use keeper::{KeeperConfig, KeeperStatus, ResidencyKeeper};
pub use ranking::{lookup_rank, GuessOutcome, RankStatus, RankingEngine, SimilarityResult};
pub use store::{StoreLoader, VectorStore};
