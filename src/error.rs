//! Error Types
//!
//! Typed failures raised by the store and the ranking engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the store and ranking paths.
#[derive(Debug, Error)]
pub enum WordSimError {
    /// The embedding source (or cache) could not be read at all.
    #[error("failed to read embedding data from {path:?}: {source}")]
    LoadIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The embedding source parsed but its structure is invalid.
    #[error("malformed embedding data in {path:?} at line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A word that is not part of the loaded vocabulary.
    #[error("word {0:?} not found in vocabulary")]
    UnknownWord(String),

    /// Every supplied candidate was filtered out (out of vocabulary or
    /// equal to the target).
    #[error("no valid candidate words after filtering")]
    EmptyCandidateSet,
}

impl WordSimError {
    pub(crate) fn load_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LoadIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WordSimError>;
