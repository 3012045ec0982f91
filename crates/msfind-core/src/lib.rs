//! # msfind core
//!
//! Retrieval logic for msfind: chunking, tokenization, TF-IDF index
//! building, snapshot validation, query ranking, and the chunk source
//! trait.
//!
//! This crate performs no filesystem or network I/O. Persistence and the
//! concrete remote/file-backed sources live in the `msfind` app crate.
//!
//! ```text
//! document text ──▶ chunk ──▶ IndexBuilder::build ──▶ IndexSnapshot
//!                                                          │
//! question ──▶ tokenize ──▶ search::query ◀────────────────┘
//!                                │
//!                                ▼
//!                           RankedResult
//! ```

pub mod chunk;
pub mod error;
pub mod index;
pub mod models;
pub mod search;
pub mod snapshot;
pub mod source;
pub mod tokenize;

pub use error::IndexError;
pub use index::IndexBuilder;
pub use models::{Chunk, DocType};
pub use snapshot::{IndexSnapshot, SharedIndex};
