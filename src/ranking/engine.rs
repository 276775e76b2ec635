//! Similarity Ranking Engine
//!
//! Scores a candidate set against a target word over an immutable store
//! snapshot. All operations are pure over (inputs, snapshot) and safe to
//! call concurrently without coordination.

use std::sync::Arc;

use crate::error::Result;
use crate::store::{cosine_similarity, VectorStore};

use super::result::{lookup_rank, RankStatus, SimilarityResult};

/// Default ranking cutoff.
pub const DEFAULT_TOP_K: usize = 100;

/// Outcome of a full guess evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessOutcome {
    /// Standing relative to the captured ranking
    pub status: RankStatus,
    /// Percentage similarity to the target, when the guess is in vocabulary
    pub score: Option<f64>,
}

/// Ranking engine over a shared store snapshot.
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<VectorStore>,
    top_k: usize,
}

impl RankingEngine {
    /// Create an engine with the default top-100 cutoff.
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self {
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override the ranking cutoff.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// The store snapshot this engine scores against.
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Rank `candidates` by similarity to `target`.
    ///
    /// Candidates outside the vocabulary, or equal to the target, are
    /// filtered out before scoring. An empty filtered set yields an
    /// empty ranking, not an error; an unknown target fails fast with
    /// no partial results.
    pub fn rank<I, S>(&self, target: &str, candidates: I) -> Result<Vec<SimilarityResult>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let target_row = self.store.vector_of(target)?;

        let mut scored: Vec<(String, f64)> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let word = candidate.as_ref();
                if word == target {
                    return None;
                }
                let row = self.store.vector_of(word).ok()?;
                Some((word.to_string(), to_percentage(cosine_similarity(target_row, row))))
            })
            .collect();

        // Stable sort keeps insertion order for tied scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (word, score))| SimilarityResult {
                word,
                score,
                rank: i + 1,
            })
            .collect())
    }

    /// Clamped percentage similarity of a word pair.
    ///
    /// Exactly 100 denotes an identity match.
    pub fn score_pair(&self, a: &str, b: &str) -> Result<f64> {
        Ok(to_percentage(self.store.similarity(a, b)?))
    }

    /// Evaluate a guessed word against a captured ranking.
    ///
    /// A guess outside the vocabulary resolves purely from the ranking
    /// and candidate flag; otherwise the pair is scored and a perfect
    /// 100 reports [`RankStatus::Correct`] even when the guess never
    /// appears in the ranking (the target itself is filtered out of it).
    pub fn evaluate_guess(
        &self,
        target: &str,
        guess: &str,
        ranked: &[SimilarityResult],
        is_known_candidate: bool,
    ) -> Result<GuessOutcome> {
        if !self.store.contains(guess) {
            return Ok(GuessOutcome {
                status: lookup_rank(guess, ranked, is_known_candidate),
                score: None,
            });
        }

        let score = self.score_pair(guess, target)?;
        let status = if score >= 100.0 {
            RankStatus::Correct
        } else {
            lookup_rank(guess, ranked, is_known_candidate)
        };
        Ok(GuessOutcome {
            status,
            score: Some(score),
        })
    }
}

/// Convert a raw cosine similarity to the serving score: percentage,
/// rounded to two decimals, clamped to [0, 100]. Resemblance semantics,
/// so negative cosines map to 0.
fn to_percentage(similarity: f32) -> f64 {
    let pct = (f64::from(similarity) * 100.0 * 100.0).round() / 100.0;
    pct.clamp(0.0, 100.0)
}
