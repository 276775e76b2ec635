//! Ranking Results
//!
//! Result row and guess status types, plus the pure rank lookup.

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    /// Candidate word
    pub word: String,
    /// Percentage similarity, two decimals, in [0, 100]
    pub score: f64,
    /// 1-based position in the ranking
    pub rank: usize,
}

/// Where a guessed word stands relative to a captured ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStatus {
    /// Score of exactly 100 — an identity match, overrides any rank
    Correct,
    /// Present in the captured top list at this 1-based rank
    Ranked(usize),
    /// A known candidate that fell outside the captured top list
    OutsideTop,
    /// Neither ranked nor a registered candidate
    Unknown,
}

impl std::fmt::Display for RankStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankStatus::Correct => write!(f, "correct"),
            RankStatus::Ranked(n) => write!(f, "{n}"),
            RankStatus::OutsideTop => write!(f, "outside top 100"),
            RankStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Locate `word` in a captured ranking.
///
/// `is_known_candidate` distinguishes a candidate that fell outside the
/// top list from a word that was never registered at all.
pub fn lookup_rank(
    word: &str,
    ranked: &[SimilarityResult],
    is_known_candidate: bool,
) -> RankStatus {
    if let Some(entry) = ranked.iter().find(|e| e.word == word) {
        if entry.score >= 100.0 {
            RankStatus::Correct
        } else {
            RankStatus::Ranked(entry.rank)
        }
    } else if is_known_candidate {
        RankStatus::OutsideTop
    } else {
        RankStatus::Unknown
    }
}
