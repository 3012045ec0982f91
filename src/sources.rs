//! Chunk source selection.
//!
//! The source behind a command is chosen once, from CLI flags and config:
//!
//! | Command | Default | `--remote` |
//! |---------|---------|------------|
//! | `rebuild-index` | [`TextDirSource`] over `[corpus].text_dir` | [`RemoteTextSource`] |
//! | `query` | [`LocalSnapshotSource`] over the saved snapshot | [`RemoteTextSource`] |

use std::sync::Arc;

use anyhow::{Context, Result};

use msfind_core::source::{ChunkSource, LocalSnapshotSource};

use crate::config::{Config, RemoteConfig, DEFAULT_PAGE_SIZE};
use crate::index_store;
use crate::source_fs::TextDirSource;
use crate::source_remote::RemoteTextSource;

/// Source of raw text for a rebuild.
pub fn corpus_source(config: &Config, remote: bool) -> Result<Box<dyn ChunkSource>> {
    if remote {
        return Ok(Box::new(remote_source(config)?));
    }
    Ok(Box::new(TextDirSource::new(
        config.corpus.clone(),
        config.chunking.chunker(),
    )))
}

/// Source of a queryable snapshot.
pub fn query_source(config: &Config, remote: bool) -> Result<Box<dyn ChunkSource>> {
    if remote {
        return Ok(Box::new(remote_source(config)?));
    }
    let path = &config.index.path;
    let snapshot = index_store::load(path).with_context(|| {
        format!(
            "Failed to load index {} (run `msfind rebuild-index` first)",
            path.display()
        )
    })?;
    Ok(Box::new(LocalSnapshotSource::new(Arc::new(snapshot))))
}

fn remote_source(config: &Config) -> Result<RemoteTextSource> {
    let remote: &RemoteConfig = config
        .remote
        .as_ref()
        .context("--remote requires a [remote] section in the config file")?;
    RemoteTextSource::from_config(remote, config.chunking.chunker())
}

/// Page size passed to sources that fetch in pages.
pub fn page_size(config: &Config) -> usize {
    config
        .remote
        .as_ref()
        .map(|r| r.page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}
