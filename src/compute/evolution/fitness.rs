//! Fitness oracles for evolved program output.
//!
//! The search only needs something implementing [`Scorer`]. A character
//! bigram model trained on a corpus is provided as the default oracle.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Scores output text. Higher means more plausible.
///
/// Implementations must be deterministic for a given text; the search
/// calls them concurrently from worker threads.
pub trait Scorer: Send + Sync {
    fn score(&self, text: &[u8]) -> u64;
}

impl<F> Scorer for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn score(&self, text: &[u8]) -> u64 {
        self(text)
    }
}

/// Number of distinct byte pairs.
const BIGRAM_TABLE_SIZE: usize = 1 << 16;

/// Character bigram frequency model.
///
/// Training counts every adjacent byte pair in the corpus except runs of
/// spaces. A text scores the sum of the counts of its own adjacent pairs.
#[derive(Clone)]
pub struct BigramScorer {
    counts: Vec<u32>,
}

impl BigramScorer {
    /// Train on an in-memory corpus.
    pub fn from_corpus(corpus: &[u8]) -> Self {
        let mut counts = vec![0u32; BIGRAM_TABLE_SIZE];
        for pair in corpus.windows(2) {
            if pair == b"  " {
                continue;
            }
            let slot = &mut counts[bigram_index(pair[0], pair[1])];
            *slot = slot.saturating_add(1);
        }
        Self { counts }
    }

    /// Train on everything readable from `reader`.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ScorerError> {
        let mut corpus = Vec::new();
        reader.read_to_end(&mut corpus)?;
        if corpus.len() < 2 {
            return Err(ScorerError::CorpusTooShort(corpus.len()));
        }
        Ok(Self::from_corpus(&corpus))
    }

    /// Train on a corpus file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScorerError> {
        let file = File::open(path.as_ref()).map_err(|source| ScorerError::Open {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let scorer = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "trained bigram model from {} ({} distinct pairs)",
            path.as_ref().display(),
            scorer.distinct_pairs()
        );
        Ok(scorer)
    }

    /// Count recorded for the pair `first, second`.
    pub fn count(&self, first: u8, second: u8) -> u32 {
        self.counts[bigram_index(first, second)]
    }

    /// Number of byte pairs seen at least once.
    pub fn distinct_pairs(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }
}

impl Scorer for BigramScorer {
    fn score(&self, text: &[u8]) -> u64 {
        text.windows(2)
            .map(|pair| self.counts[bigram_index(pair[0], pair[1])] as u64)
            .sum()
    }
}

impl std::fmt::Debug for BigramScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigramScorer")
            .field("distinct_pairs", &self.distinct_pairs())
            .finish()
    }
}

#[inline]
fn bigram_index(first: u8, second: u8) -> usize {
    ((first as usize) << 8) | second as usize
}

/// Errors building a scorer.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("Failed to open corpus {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read corpus: {0}")]
    Io(#[from] io::Error),
    #[error("Corpus must hold at least two bytes, got {0}")]
    CorpusTooShort(usize),
}
