//! Immutable index snapshots and their persisted form.
//!
//! An [`IndexSnapshot`] bundles corpus term statistics, one weighted term
//! vector per chunk, the chunk metadata, and the [`Tokenizer`] the index was
//! built with. In memory every chunk owns exactly one vector, so the
//! consistency invariant holds by construction. On disk chunks and vectors
//! are stored as separate lists ([`SnapshotFile`]) and re-validated on load.
//!
//! Snapshots are never mutated after construction. Callers share them as
//! `Arc<IndexSnapshot>`; [`SharedIndex`] swaps in a rebuilt snapshot without
//! disturbing queries already holding the previous one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::models::{Chunk, DocType};
use crate::tokenize::Tokenizer;

/// Current on-disk snapshot format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Sparse token → weight mapping. `BTreeMap` keeps iteration (and therefore
/// floating-point accumulation) in sorted token order.
pub type TermVector = BTreeMap<String, f64>;

/// A chunk together with its L2-normalized TF-IDF vector.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: TermVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    tokenizer: Tokenizer,
    include_qp: bool,
    document_frequency: BTreeMap<String, usize>,
    entries: Vec<IndexedChunk>,
}

impl IndexSnapshot {
    /// Assemble a snapshot from already-weighted entries. Used by the index
    /// builder; the corpus size is the number of entries.
    pub(crate) fn from_parts(
        tokenizer: Tokenizer,
        include_qp: bool,
        document_frequency: BTreeMap<String, usize>,
        entries: Vec<IndexedChunk>,
    ) -> Self {
        Self {
            tokenizer,
            include_qp,
            document_frequency,
            entries,
        }
    }

    /// An empty snapshot: queries against it always return no results.
    pub fn empty(tokenizer: Tokenizer, include_qp: bool) -> Self {
        Self::from_parts(tokenizer, include_qp, BTreeMap::new(), Vec::new())
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Whether question-paper chunks were eligible when this snapshot was built.
    pub fn include_qp(&self) -> bool {
        self.include_qp
    }

    /// Number of chunks `N` the term statistics were computed over.
    pub fn corpus_size(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.document_frequency.len()
    }

    pub fn document_frequency(&self, token: &str) -> Option<usize> {
        self.document_frequency.get(token).copied()
    }

    pub fn document_frequencies(&self) -> &BTreeMap<String, usize> {
        &self.document_frequency
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Count chunks per document type.
    pub fn doc_type_counts(&self) -> BTreeMap<DocType, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.entries {
            *counts.entry(e.chunk.doc_type).or_insert(0) += 1;
        }
        counts
    }

    /// Convert to the persisted representation.
    pub fn to_file(&self) -> SnapshotFile {
        SnapshotFile {
            format_version: SNAPSHOT_FORMAT_VERSION,
            corpus_size: self.corpus_size(),
            include_qp: self.include_qp,
            tokenizer: self.tokenizer.clone(),
            document_frequency: self.document_frequency.clone(),
            chunks: self.entries.iter().map(|e| e.chunk.clone()).collect(),
            vectors: self
                .entries
                .iter()
                .map(|e| VectorRecord {
                    chunk_id: e.chunk.chunk_id.clone(),
                    weights: e.vector.clone(),
                })
                .collect(),
        }
    }

    /// Validate a persisted snapshot and rebuild the in-memory form.
    ///
    /// Rejects, as [`IndexError::CorruptIndex`]: unknown format versions,
    /// duplicate chunk IDs, vectors referencing unknown chunks, chunks with
    /// no vector, a corpus size that disagrees with the chunk list,
    /// out-of-range document frequencies, vector tokens missing from the
    /// term statistics, non-finite weights, and question-paper chunks in a
    /// snapshot built without them.
    pub fn from_file(file: SnapshotFile) -> Result<Self> {
        if file.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {})",
                file.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        if file.corpus_size != file.chunks.len() {
            return Err(corrupt(format!(
                "corpus size {} does not match {} chunks",
                file.corpus_size,
                file.chunks.len()
            )));
        }

        let mut seen = HashSet::new();
        for chunk in &file.chunks {
            if !seen.insert(chunk.chunk_id.as_str()) {
                return Err(corrupt(format!("duplicate chunk id '{}'", chunk.chunk_id)));
            }
            if !file.include_qp && chunk.doc_type == DocType::QuestionPaper {
                return Err(corrupt(format!(
                    "question-paper chunk '{}' in a mark-scheme-only index",
                    chunk.chunk_id
                )));
            }
        }

        for (token, df) in &file.document_frequency {
            if *df == 0 || *df > file.corpus_size {
                return Err(corrupt(format!(
                    "document frequency {} for '{}' outside 1..={}",
                    df, token, file.corpus_size
                )));
            }
        }

        let mut vectors: HashMap<String, TermVector> = HashMap::with_capacity(file.vectors.len());
        for record in file.vectors {
            if !seen.contains(record.chunk_id.as_str()) {
                return Err(corrupt(format!(
                    "vector references unknown chunk '{}'",
                    record.chunk_id
                )));
            }
            for (token, weight) in &record.weights {
                if !weight.is_finite() {
                    return Err(corrupt(format!(
                        "non-finite weight for '{}' in chunk '{}'",
                        token, record.chunk_id
                    )));
                }
                if !file.document_frequency.contains_key(token) {
                    return Err(corrupt(format!(
                        "token '{}' in chunk '{}' has no document frequency",
                        token, record.chunk_id
                    )));
                }
            }
            if vectors.insert(record.chunk_id.clone(), record.weights).is_some() {
                return Err(corrupt(format!(
                    "duplicate vector for chunk '{}'",
                    record.chunk_id
                )));
            }
        }

        let mut entries = Vec::with_capacity(file.chunks.len());
        for chunk in file.chunks {
            let vector = vectors
                .remove(&chunk.chunk_id)
                .ok_or_else(|| corrupt(format!("chunk '{}' has no vector", chunk.chunk_id)))?;
            entries.push(IndexedChunk { chunk, vector });
        }

        Ok(Self::from_parts(
            file.tokenizer,
            file.include_qp,
            file.document_frequency,
            entries,
        ))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_file())
    }

    /// Parse and validate JSON. Malformed JSON is reported as corruption,
    /// since a truncated or hand-edited file is indistinguishable from one.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(json).map_err(|e| corrupt(format!("malformed snapshot: {}", e)))?;
        Self::from_file(file)
    }
}

fn corrupt(msg: String) -> IndexError {
    IndexError::CorruptIndex(msg)
}

/// Persisted snapshot layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub format_version: u32,
    pub corpus_size: usize,
    #[serde(default)]
    pub include_qp: bool,
    #[serde(default)]
    pub tokenizer: Tokenizer,
    pub document_frequency: BTreeMap<String, usize>,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<VectorRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub weights: TermVector,
}

/// Caller-owned handle to the current snapshot.
///
/// Readers take a cheap `Arc` clone and query it without holding any lock;
/// a rebuild constructs a new snapshot off to the side and publishes it
/// with [`replace`](SharedIndex::replace).
pub struct SharedIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl SharedIndex {
    pub fn new(snapshot: IndexSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<IndexSnapshot> {
        // The guarded value is an immutable Arc, so a poisoned lock still
        // holds a consistent snapshot.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Publish a new snapshot, returning the one it replaced.
    pub fn replace(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }
}
