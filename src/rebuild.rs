//! `msfind rebuild-index`: list chunks, build a fresh snapshot, and swap it
//! into place on disk.

use anyhow::{Context, Result};
use tracing::{info, warn};

use msfind_core::source::ListOptions;
use msfind_core::DocType;

use crate::config::Config;
use crate::index_store;
use crate::sources;

#[derive(Debug, Clone, Default)]
pub struct RebuildOptions<'a> {
    pub include_qp: bool,
    pub remote: bool,
    pub subject: Option<&'a str>,
}

pub async fn run_rebuild_index(config: &Config, opts: &RebuildOptions<'_>) -> Result<()> {
    let include_qp = opts.include_qp || config.index.include_qp;
    let source = sources::corpus_source(config, opts.remote)?;
    let list_opts = ListOptions {
        subject: opts.subject,
        include_qp,
        page_size: sources::page_size(config),
    };

    let chunks = source.list_chunks(&list_opts).await?;
    info!(source = source.name(), chunks = chunks.len(), "listed chunks");

    let snapshot = config.chunking.index_builder().build(&chunks, include_qp);
    if snapshot.is_empty() {
        warn!(
            source = source.name(),
            "no eligible chunks; writing an empty index"
        );
    }

    let path = &config.index.path;
    let digest = index_store::save(&snapshot, path)
        .with_context(|| format!("Failed to write index {}", path.display()))?;

    let counts = snapshot.doc_type_counts();
    println!("Index rebuilt: {}", path.display());
    println!("  source:       {}", source.name());
    println!("  chunks:       {}", snapshot.len());
    println!(
        "  mark scheme:  {}",
        counts.get(&DocType::MarkScheme).copied().unwrap_or(0)
    );
    println!(
        "  question:     {}",
        counts.get(&DocType::QuestionPaper).copied().unwrap_or(0)
    );
    println!("  vocabulary:   {}", snapshot.vocabulary_size());
    println!("  sha256:       {}", digest);
    Ok(())
}
