//! Query engine: ranks snapshot chunks against a free-text question.
//!
//! # Algorithm
//!
//! 1. Optionally expand known acronyms in the question text.
//! 2. Tokenize with the snapshot's own [`Tokenizer`](crate::tokenize::Tokenizer).
//! 3. Weight query tokens with the snapshot's document frequencies
//!    (`tf × ln(N / df)`), dropping tokens the corpus has never seen, and
//!    normalize to unit length.
//! 4. Score every candidate by cosine similarity. Candidates are all
//!    chunks, or only those whose question label matches the filter.
//! 5. Drop non-positive scores, sort by score (desc), position (asc),
//!    snapshot order (asc).
//! 6. Truncate to `k`.
//!
//! A query with no recognized tokens returns an empty result rather than
//! an arbitrary ranking; callers treat that as "no relevant passages".

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::index::{term_frequencies, weigh};
use crate::models::Chunk;
use crate::snapshot::{IndexSnapshot, TermVector};

/// Acronyms common in computing mark schemes, with their long forms.
pub const ACRONYM_EXPANSIONS: &[(&str, &str)] = &[
    ("alu", "arithmetic logic unit"),
    ("cu", "control unit"),
    ("ram", "random access memory"),
    ("rom", "read only memory"),
    ("cpu", "central processing unit"),
];

/// Bundles all inputs for a single query.
#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub question: &'a str,
    /// Maximum number of results.
    pub k: usize,
    /// Restrict candidates to chunks labelled with this question ID.
    pub question_id: Option<&'a str>,
    /// Append long forms of recognized acronyms before tokenizing.
    pub expand_acronyms: bool,
}

impl<'a> QueryRequest<'a> {
    pub fn new(question: &'a str, k: usize) -> Self {
        Self {
            question,
            k,
            question_id: None,
            expand_acronyms: false,
        }
    }
}

/// One ranked chunk.
#[derive(Debug, Clone, Serialize)]
pub struct RankedChunk<'a> {
    pub chunk: &'a Chunk,
    /// Cosine similarity in `(0.0, 1.0]`.
    pub score: f64,
}

/// Ordered query results, best first. Empty means "no relevant passages".
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedResult<'a> {
    pub items: Vec<RankedChunk<'a>>,
}

impl<'a> RankedResult<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedChunk<'a>> {
        self.items.iter()
    }

    /// Chunk texts in rank order, as handed to an answer formatter.
    pub fn texts(&self) -> Vec<&'a str> {
        self.items.iter().map(|r| r.chunk.text.as_str()).collect()
    }
}

/// Rank the snapshot's chunks for `question`, returning at most `k`.
pub fn query<'s>(
    snapshot: &'s IndexSnapshot,
    question: &str,
    k: usize,
    question_id: Option<&str>,
) -> RankedResult<'s> {
    search(
        snapshot,
        &QueryRequest {
            question,
            k,
            question_id,
            expand_acronyms: false,
        },
    )
}

/// Run a query described by a [`QueryRequest`].
pub fn search<'s>(snapshot: &'s IndexSnapshot, req: &QueryRequest<'_>) -> RankedResult<'s> {
    if req.k == 0 || snapshot.is_empty() {
        return RankedResult::default();
    }

    let expanded;
    let text = if req.expand_acronyms {
        expanded = expand_acronyms(req.question);
        expanded.as_str()
    } else {
        req.question
    };

    let query_vec = query_vector(snapshot, text);
    if query_vec.is_empty() {
        debug!(question = req.question, "no indexed tokens in query");
        return RankedResult::default();
    }

    let mut scored: Vec<(usize, RankedChunk<'s>)> = snapshot
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| match req.question_id {
            Some(qid) => e.chunk.matches_question_id(qid),
            None => true,
        })
        .filter_map(|(order, e)| {
            let score = dot(&query_vec, &e.vector);
            (score > 0.0).then_some((
                order,
                RankedChunk {
                    chunk: &e.chunk,
                    score,
                },
            ))
        })
        .collect();

    scored.sort_by(|(order_a, a), (order_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.chunk.position.cmp(&b.chunk.position))
            .then(order_a.cmp(order_b))
    });
    scored.truncate(req.k);

    debug!(
        query_terms = query_vec.len(),
        results = scored.len(),
        "ranked query"
    );

    RankedResult {
        items: scored.into_iter().map(|(_, r)| r).collect(),
    }
}

/// Unit-length query vector built from the snapshot's term statistics.
/// The snapshot itself is never modified.
pub fn query_vector(snapshot: &IndexSnapshot, text: &str) -> TermVector {
    let tokens = snapshot.tokenizer().tokenize(text);
    let counts = term_frequencies(&tokens);
    weigh(&counts, snapshot.document_frequencies(), snapshot.corpus_size())
}

/// Append the long form of each acronym found in the question.
pub fn expand_acronyms(question: &str) -> String {
    let lower = question.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let expansions: Vec<&str> = ACRONYM_EXPANSIONS
        .iter()
        .filter(|(short, _)| words.contains(short))
        .map(|(_, long)| *long)
        .collect();
    if expansions.is_empty() {
        question.to_string()
    } else {
        format!("{} {}", question, expansions.join(" "))
    }
}

/// Dot product of two sparse vectors; with unit-length inputs this is the
/// cosine similarity. Iterates the query side in sorted order.
fn dot(query: &TermVector, chunk: &TermVector) -> f64 {
    query
        .iter()
        .filter_map(|(token, qw)| chunk.get(token).map(|cw| qw * cw))
        .sum()
}
