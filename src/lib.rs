//! # msfind
//!
//! Mark-scheme passage retrieval for exam questions.
//!
//! Extracted past-paper text is split into question-labelled chunks,
//! weighted with TF-IDF, and saved as a JSON snapshot. Questions are ranked
//! against the snapshot by cosine similarity and the best passages are
//! formatted into a short answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │  Sources     │──▶│  msfind-core  │──▶│  Snapshot    │
//! │ text dir /   │   │ chunk+weigh   │   │  (JSON file) │
//! │ remote store │   └───────────────┘   └──────┬───────┘
//! └──────────────┘                              │
//!                                               ▼
//!                       ┌──────────┐     ┌──────────────┐
//!                       │  answer  │◀────│    query     │
//!                       └──────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! msfind rebuild-index
//! msfind query "Describe the purpose of the ALU (2)"
//! msfind stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`source_fs`] | Extracted-text directory source |
//! | [`source_remote`] | Remote REST text store source |
//! | [`sources`] | Source selection per command |
//! | [`index_store`] | Atomic snapshot persistence |
//! | [`answer`] | Command-word detection and answer formatting |
//! | [`rebuild`], [`query`], [`stats`] | CLI commands |

pub mod answer;
pub mod config;
pub mod index_store;
pub mod query;
pub mod rebuild;
pub mod source_fs;
pub mod source_remote;
pub mod sources;
pub mod stats;
