//! Engine Configuration

use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the store, ranking engine and keeper.
#[derive(Debug, Clone)]
pub struct Config {
    /// Textual embedding source (word2vec `.vec` format)
    pub embedding_path: PathBuf,

    /// Compact binary cache written after the first parse
    pub cache_path: PathBuf,

    /// Ranking cutoff (entries beyond this are dropped)
    pub top_k: usize,

    /// Residency keeper cycle interval
    pub keeper_interval: Duration,

    /// Rows per chunk in the keeper's table walk
    pub keeper_chunk_rows: usize,

    /// Sample every Kth row inside a chunk
    pub keeper_sample_stride: usize,

    /// Random vocabulary keys looked up per cycle
    pub keeper_key_samples: usize,

    /// Random similarity computations per cycle
    pub keeper_sim_samples: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding_path: PathBuf::from("cc.ko.300.vec"),
            cache_path: PathBuf::from("cc.ko.300.wsvc"),
            top_k: 100,
            keeper_interval: Duration::from_secs(600),
            keeper_chunk_rows: 4096,
            keeper_sample_stride: 64,
            keeper_key_samples: 32,
            keeper_sim_samples: 8,
        }
    }
}

impl Config {
    /// Set the textual embedding source path
    pub fn with_embedding_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.embedding_path = path.into();
        self
    }

    /// Set the compact cache path
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Set the ranking cutoff
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the keeper cycle interval
    pub fn with_keeper_interval(mut self, interval: Duration) -> Self {
        self.keeper_interval = interval;
        self
    }
}
