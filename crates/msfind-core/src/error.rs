use thiserror::Error;

/// Errors raised by the index layer.
///
/// Tokenization and querying never fail: malformed text simply yields
/// fewer tokens, and unknown query tokens contribute zero weight.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No eligible chunks were supplied to a build. The resulting
    /// snapshot is still valid, just empty.
    #[error("Empty corpus: no eligible chunks to index")]
    EmptyCorpus,

    /// A loaded snapshot failed its structural invariants.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
