//! TF-IDF index builder.
//!
//! # Weighting
//!
//! For a corpus of `N` eligible chunks, each token `t` in chunk `c` gets
//!
//! ```text
//! w(t, c) = tf(t, c) × ln(N / df(t))
//! ```
//!
//! where `tf` is the raw count of `t` in `c` and `df` the number of chunks
//! containing `t` (floored at 1). Each chunk vector is then scaled to unit
//! L2 length so chunk size does not bias cosine scores. Tokens present in
//! every chunk get weight zero and are dropped from the sparse vectors.
//!
//! Every map involved is a `BTreeMap`, so sums run in sorted token order and
//! the same input always produces bit-identical weights.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::IndexError;
use crate::models::Chunk;
use crate::snapshot::{IndexSnapshot, IndexedChunk, TermVector};
use crate::tokenize::Tokenizer;

#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    tokenizer: Tokenizer,
}

impl IndexBuilder {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Build a full snapshot from `chunks`.
    ///
    /// Only mark-scheme chunks are indexed unless `include_qp` is set.
    /// Repeated chunk IDs keep their first occurrence. Zero eligible chunks
    /// produce a valid, empty snapshot.
    pub fn build(&self, chunks: &[Chunk], include_qp: bool) -> IndexSnapshot {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut eligible: Vec<&Chunk> = Vec::new();
        for chunk in chunks {
            if !chunk.doc_type.is_included(include_qp) {
                continue;
            }
            if !seen.insert(chunk.chunk_id.as_str()) {
                warn!(chunk_id = %chunk.chunk_id, "duplicate chunk id skipped");
                continue;
            }
            eligible.push(chunk);
        }

        if eligible.is_empty() {
            warn!(total = chunks.len(), include_qp, "{}", IndexError::EmptyCorpus);
            return IndexSnapshot::empty(self.tokenizer.clone(), include_qp);
        }

        let term_counts: Vec<BTreeMap<String, usize>> = eligible
            .iter()
            .map(|c| term_frequencies(&self.tokenizer.tokenize(&c.text)))
            .collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for counts in &term_counts {
            for token in counts.keys() {
                *document_frequency.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let n = eligible.len();
        let entries: Vec<IndexedChunk> = eligible
            .into_iter()
            .zip(term_counts.iter())
            .map(|(chunk, counts)| IndexedChunk {
                chunk: chunk.clone(),
                vector: weigh(counts, &document_frequency, n),
            })
            .collect();

        debug!(
            chunks = n,
            vocabulary = document_frequency.len(),
            skipped = chunks.len() - n,
            include_qp,
            "built index snapshot"
        );

        IndexSnapshot::from_parts(self.tokenizer.clone(), include_qp, document_frequency, entries)
    }
}

/// Build with the default tokenizer.
pub fn build(chunks: &[Chunk], include_qp: bool) -> IndexSnapshot {
    IndexBuilder::default().build(chunks, include_qp)
}

/// Count token occurrences.
pub(crate) fn term_frequencies(tokens: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

/// Inverse document frequency, `ln(N / df)` with `df` floored at 1.
pub fn idf(corpus_size: usize, df: usize) -> f64 {
    (corpus_size as f64 / df.max(1) as f64).ln()
}

/// Turn term counts into a unit-length TF-IDF vector using the given
/// corpus statistics. Tokens absent from `document_frequency` are ignored;
/// they never appear in the result.
pub(crate) fn weigh(
    counts: &BTreeMap<String, usize>,
    document_frequency: &BTreeMap<String, usize>,
    corpus_size: usize,
) -> TermVector {
    let mut vector: TermVector = counts
        .iter()
        .filter_map(|(token, tf)| {
            let df = *document_frequency.get(token)?;
            let weight = *tf as f64 * idf(corpus_size, df);
            (weight > 0.0).then(|| (token.clone(), weight))
        })
        .collect();

    let norm = l2_norm(&vector);
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
    vector
}

/// L2 norm, accumulated in the map's sorted order.
pub fn l2_norm(vector: &TermVector) -> f64 {
    vector.values().map(|w| w * w).sum::<f64>().sqrt()
}
