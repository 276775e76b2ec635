//! Vector Store
//!
//! Immutable in-memory word-embedding table with a word → row index.
//! Rows are stored as contiguous half-precision floats; the table is
//! read-only after construction, so any number of readers may share it
//! without coordination.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use half::f16;
use hashbrown::HashMap;
use tracing::{debug, info};

use super::similarity::cosine_similarity;
use crate::error::{Result, WordSimError};

/// Immutable embedding table plus word index.
#[derive(Debug)]
pub struct VectorStore {
    /// Row-major table, `len() * dim` half-precision floats
    table: Vec<f16>,
    /// Embedding dimensionality
    dim: usize,
    /// word -> row index
    index: HashMap<String, usize>,
    /// row index -> word
    words: Vec<String>,
}

impl VectorStore {
    /// Build a store from prepared entries.
    ///
    /// Duplicate words keep their first occurrence so the word index
    /// stays bijective with the table rows.
    pub fn from_entries<I, S>(dim: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        if dim == 0 {
            return Err(WordSimError::malformed("<entries>", 0, "zero dimensionality"));
        }

        let mut table = Vec::new();
        let mut index = HashMap::new();
        let mut words = Vec::new();

        for (word, vector) in entries {
            let word = word.into();
            if vector.len() != dim {
                return Err(WordSimError::malformed(
                    "<entries>",
                    words.len() + 1,
                    format!("expected {} components, got {}", dim, vector.len()),
                ));
            }
            if index.contains_key(&word) {
                debug!(word = %word, "duplicate word skipped");
                continue;
            }
            index.insert(word.clone(), words.len());
            words.push(word);
            table.extend(vector.into_iter().map(f16::from_f32));
        }

        Ok(Self {
            table,
            dim,
            index,
            words,
        })
    }

    pub(crate) fn from_raw_parts(
        table: Vec<f16>,
        dim: usize,
        words: Vec<String>,
    ) -> Result<Self> {
        if table.len() != words.len() * dim {
            return Err(WordSimError::malformed(
                "<cache>",
                0,
                format!(
                    "table holds {} floats but {} words x {} dims were declared",
                    table.len(),
                    words.len(),
                    dim
                ),
            ));
        }
        let index: HashMap<String, usize> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        if index.len() != words.len() {
            return Err(WordSimError::malformed(
                "<cache>",
                0,
                "duplicate words in vocabulary section",
            ));
        }
        Ok(Self {
            table,
            dim,
            index,
            words,
        })
    }

    /// Parse a textual word2vec/fastText `.vec` source.
    ///
    /// First line is `N D`; each following line is a word and D
    /// space-separated components. Byte sequences that are not valid
    /// UTF-8 are replaced rather than failing the whole load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| WordSimError::load_io(path, e))?;
        let mut reader = BufReader::new(file);

        let header = read_lossy_line(&mut reader, path)?
            .ok_or_else(|| WordSimError::malformed(path, 1, "empty embedding source"))?;
        let mut parts = header.split_whitespace();
        let declared: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| WordSimError::malformed(path, 1, "header missing vocabulary size"))?;
        let dim: usize = parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| WordSimError::malformed(path, 1, "header missing dimensionality"))?;
        if dim == 0 {
            return Err(WordSimError::malformed(path, 1, "zero dimensionality"));
        }

        let mut table = Vec::with_capacity(declared.saturating_mul(dim));
        let mut index: HashMap<String, usize> = HashMap::with_capacity(declared);
        let mut words = Vec::with_capacity(declared);
        let mut line_no = 1usize;

        while let Some(line) = read_lossy_line(&mut reader, path)? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let word = tokens
                .next()
                .ok_or_else(|| WordSimError::malformed(path, line_no, "missing word token"))?
                .to_string();

            if index.contains_key(&word) {
                debug!(word = %word, line = line_no, "duplicate word skipped");
                continue;
            }

            let row_start = table.len();
            for token in tokens {
                let value: f32 = token.parse().map_err(|_| {
                    WordSimError::malformed(path, line_no, format!("bad float {token:?}"))
                })?;
                table.push(f16::from_f32(value));
            }
            let got = table.len() - row_start;
            if got != dim {
                return Err(WordSimError::malformed(
                    path,
                    line_no,
                    format!("expected {dim} components, got {got}"),
                ));
            }

            index.insert(word.clone(), words.len());
            words.push(word);
        }

        if words.is_empty() {
            return Err(WordSimError::malformed(path, line_no, "no vectors in source"));
        }
        if words.len() != declared {
            debug!(
                declared = declared,
                loaded = words.len(),
                "header count differs from loaded rows"
            );
        }

        info!(vocab = words.len(), dim = dim, "embedding table loaded from text");
        Ok(Self {
            table,
            dim,
            index,
            words,
        })
    }

    /// Number of vocabulary entries (== table rows).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if no vectors are loaded.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Embedding dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Membership test.
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Row for a vocabulary word.
    pub fn vector_of(&self, word: &str) -> Result<&[f16]> {
        let idx = self
            .index
            .get(word)
            .copied()
            .ok_or_else(|| WordSimError::UnknownWord(word.to_string()))?;
        Ok(self.row_unchecked(idx))
    }

    /// Row by index, if in range.
    pub fn row(&self, idx: usize) -> Option<&[f16]> {
        if idx < self.words.len() {
            Some(self.row_unchecked(idx))
        } else {
            None
        }
    }

    /// Word at a row index, if in range.
    pub fn word_at(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    /// Cosine similarity between two vocabulary words, in [-1, 1].
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let va = self.vector_of(a)?;
        let vb = self.vector_of(b)?;
        if a == b {
            return Ok(1.0);
        }
        Ok(cosine_similarity(va, vb))
    }

    pub(crate) fn raw_table(&self) -> &[f16] {
        &self.table
    }

    pub(crate) fn raw_words(&self) -> &[String] {
        &self.words
    }

    fn row_unchecked(&self, idx: usize) -> &[f16] {
        let start = idx * self.dim;
        &self.table[start..start + self.dim]
    }
}

/// Read one line, replacing invalid UTF-8 instead of failing.
fn read_lossy_line(reader: &mut impl BufRead, path: &Path) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .read_until(b'\n', &mut buf)
        .map_err(|e| WordSimError::load_io(path, e))?;
    if read == 0 {
        return Ok(None);
    }
    while buf.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
