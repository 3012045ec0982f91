//! Index statistics.
//!
//! Summarizes the saved snapshot: corpus size, vocabulary, chunk counts per
//! document type and per source document. Used by `msfind stats` to check
//! that a rebuild picked up what was expected.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use msfind_core::DocType;

use crate::config::Config;
use crate::index_store;

pub fn run_stats(config: &Config) -> Result<()> {
    let path = &config.index.path;
    let snapshot = index_store::load(path)
        .with_context(|| format!("Failed to load index {}", path.display()))?;
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let digest = index_store::file_digest(path)?;
    let counts = snapshot.doc_type_counts();

    println!("msfind index stats");
    println!("==================");
    println!();
    println!("  Index:        {}", path.display());
    println!("  Size:         {}", human_size(size));
    println!("  SHA-256:      {}", digest);
    println!("  Include QP:   {}", snapshot.include_qp());
    println!();
    println!("  Chunks:       {}", snapshot.corpus_size());
    println!("  Vocabulary:   {}", snapshot.vocabulary_size());
    for doc_type in [DocType::MarkScheme, DocType::QuestionPaper] {
        println!(
            "  {:<13} {}",
            format!("{}:", doc_type),
            counts.get(&doc_type).copied().unwrap_or(0)
        );
    }

    let mut per_document: BTreeMap<&str, usize> = BTreeMap::new();
    for chunk in snapshot.chunks() {
        *per_document.entry(chunk.source_document_id.as_str()).or_insert(0) += 1;
    }
    if !per_document.is_empty() {
        println!();
        println!("  {:<48} {:>6}", "DOCUMENT", "CHUNKS");
        println!("  {}", "-".repeat(55));
        for (doc, n) in &per_document {
            println!("  {:<48} {:>6}", doc, n);
        }
    }
    println!();
    Ok(())
}

/// Size with a binary unit suffix, one decimal above bytes.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 bytes");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MiB");
        assert_eq!(human_size(5 * 1024u64.pow(4)), "5.0 TiB");
    }
}
