//! Token normalization shared by corpus chunks and queries.
//!
//! The same [`Tokenizer`] value must be used to index a corpus and to
//! query it; the index snapshot stores the tokenizer it was built with so
//! a loaded snapshot is always queried with matching settings.
//!
//! Normalization steps, in order:
//!
//! 1. Collapse hyphenation variants (`real time`, `real - time`) to `real-time`.
//! 2. Lowercase.
//! 3. Split on whitespace.
//! 4. Strip non-alphanumeric characters from both ends of each token.
//! 5. Drop stopwords and tokens shorter than `min_token_len` characters.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum token length (in characters) kept by default.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

/// Built-in stopwords: English function words plus the exam command words
/// that appear in questions but carry no answer content.
pub const STOPWORDS: &[&str] = &[
    "the", "and", "or", "to", "of", "a", "an", "in", "on", "for", "with", "by", "is", "are",
    "was", "were", "be", "been", "being", "that", "this", "these", "those", "as", "at", "from",
    "it", "its", "into", "over", "under", "between", "within", "without", "use", "used", "using",
    "can", "may", "will", "would", "should", "could", "do", "does", "did", "done", "what",
    "which", "how", "why", "explain", "describe", "identify", "state", "give", "define",
    "outline", "compare", "contrast",
];

/// Configurable tokenizer. Cheap to clone; carries no compiled state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    pub min_token_len: usize,
    /// Additional stopwords on top of [`STOPWORDS`], stored lowercased.
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            extra_stopwords: Vec::new(),
        }
    }
}

impl Tokenizer {
    pub fn new(min_token_len: usize, extra_stopwords: &[String]) -> Self {
        let mut extra: Vec<String> = extra_stopwords
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        extra.sort();
        extra.dedup();
        Self {
            min_token_len,
            extra_stopwords: extra,
        }
    }

    /// Split text into normalized tokens. Never fails; text with no usable
    /// words yields an empty vector.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize_hyphenation(text).to_lowercase();
        normalized
            .split_whitespace()
            .filter_map(|raw| {
                let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
                if token.chars().count() < self.min_token_len.max(1) {
                    return None;
                }
                if self.is_stopword(token) {
                    return None;
                }
                Some(token.to_string())
            })
            .collect()
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        STOPWORDS.contains(&token) || self.extra_stopwords.iter().any(|w| w == token)
    }
}

/// Tokenize with default settings.
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::default().tokenize(text)
}

fn normalize_hyphenation(text: &str) -> String {
    static REAL_TIME: OnceLock<Regex> = OnceLock::new();
    let re = REAL_TIME.get_or_init(|| {
        Regex::new(r"(?i)\breal\s*-\s*time\b|\breal\s+time\b").expect("real-time pattern is valid")
    });
    re.replace_all(text, "real-time").into_owned()
}
