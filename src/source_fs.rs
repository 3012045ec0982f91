//! Extracted-text directory source.
//!
//! Walks `[corpus].text_dir` for text files produced by the PDF extraction
//! step and chunks each one. File stems follow the past-paper naming
//! scheme `{subject_code}_{session}{yy}_{qp|ms}_{paper_code}` (e.g.
//! `9618_s23_ms_12`), which gives each document its type. Files may sit in
//! per-subject subdirectories (`text/computer-science/9618_s23_ms_12.txt`).

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use msfind_core::chunk::Chunker;
use msfind_core::models::SourceDocument;
use msfind_core::source::{ChunkSource, ListOptions};
use msfind_core::{Chunk, DocType};

use crate::config::CorpusConfig;

/// Metadata parsed from a past-paper file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperMeta {
    pub subject_code: String,
    pub session: String,
    pub year: u32,
    pub doc_type: DocType,
    pub paper_code: String,
}

/// Parse `9618_s23_ms_12`-style stems. Returns `None` for other names.
pub fn parse_paper_meta(stem: &str) -> Option<PaperMeta> {
    static FILENAME: OnceLock<Regex> = OnceLock::new();
    let re = FILENAME.get_or_init(|| {
        Regex::new(r"(?i)(\d{4})_([a-z])(\d{2})_(qp|ms)_(\d+)").expect("file name pattern is valid")
    });
    let caps = re.captures(stem)?;
    let year: u32 = caps[3].parse().ok()?;
    Some(PaperMeta {
        subject_code: caps[1].to_string(),
        session: caps[2].to_lowercase(),
        year: 2000 + year,
        doc_type: DocType::from_code(&caps[4]),
        paper_code: caps[5].to_string(),
    })
}

/// Document type for a file stem: parsed metadata first, then a plain
/// `_ms_` marker; anything else is treated as a question paper.
pub fn doc_type_for_stem(stem: &str) -> DocType {
    match parse_paper_meta(stem) {
        Some(meta) => meta.doc_type,
        None if stem.to_lowercase().contains("_ms_") => DocType::MarkScheme,
        None => DocType::QuestionPaper,
    }
}

pub struct TextDirSource {
    config: CorpusConfig,
    chunker: Chunker,
}

impl TextDirSource {
    pub fn new(config: CorpusConfig, chunker: Chunker) -> Self {
        Self { config, chunker }
    }

    /// Read every matching file as a [`SourceDocument`], sorted by ID.
    pub fn scan_documents(&self, opts: &ListOptions<'_>) -> Result<Vec<SourceDocument>> {
        let root = &self.config.text_dir;
        if !root.exists() {
            bail!("Text directory does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.config.include_globs)?;
        let exclude_set = build_globset(&self.config.exclude_globs)?;
        let subject = opts.subject.map(|s| s.trim().to_lowercase());

        let mut docs = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let doc_type = doc_type_for_stem(&stem);
            if !doc_type.is_included(opts.include_qp) {
                continue;
            }

            if let Some(wanted) = &subject {
                if !subject_matches(relative, &stem, wanted) {
                    continue;
                }
            }

            let text = read_text(path)?;
            if text.trim().is_empty() {
                warn!(file = %rel_str, "skipping empty text file");
                continue;
            }

            docs.push(SourceDocument {
                source_document_id: document_id(&rel_str),
                doc_type,
                text,
            });
        }

        docs.sort_by(|a, b| a.source_document_id.cmp(&b.source_document_id));
        debug!(root = %root.display(), documents = docs.len(), "scanned text directory");
        Ok(docs)
    }
}

#[async_trait]
impl ChunkSource for TextDirSource {
    fn name(&self) -> &str {
        "text-dir"
    }

    async fn list_chunks(&self, opts: &ListOptions<'_>) -> Result<Vec<Chunk>> {
        let docs = self.scan_documents(opts)?;
        Ok(docs
            .iter()
            .flat_map(|d| self.chunker.chunk(&d.text, d.doc_type, &d.source_document_id))
            .collect())
    }
}

/// A subject matches the file's top-level directory or its subject code.
fn subject_matches(relative: &Path, stem: &str, wanted: &str) -> bool {
    let mut components = relative.components();
    let top_dir = match (components.next(), components.next()) {
        (Some(first), Some(_)) => Some(first.as_os_str().to_string_lossy().to_lowercase()),
        _ => None,
    };
    if top_dir.as_deref() == Some(wanted) {
        return true;
    }
    parse_paper_meta(stem).is_some_and(|meta| meta.subject_code == wanted)
}

/// Relative path without its extension, e.g. `cs/9618_s23_ms_12`.
fn document_id(rel_str: &str) -> String {
    match rel_str.rsplit_once('.') {
        Some((base, ext)) if !ext.contains('/') => base.to_string(),
        _ => rel_str.to_string(),
    }
}

fn read_text(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TextDirSource) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("text");
        fs::create_dir_all(root.join("computer-science")).unwrap();
        fs::write(
            root.join("computer-science/9618_s23_ms_12.txt"),
            "1 (a) fetch decode execute\n2 the alu performs arithmetic\n",
        )
        .unwrap();
        fs::write(
            root.join("computer-science/9618_s23_qp_12.txt"),
            "1 (a) Describe the fetch-execute cycle.\n",
        )
        .unwrap();
        fs::write(root.join("9700_w22_ms_21.txt"), "1 mitochondria release energy\n").unwrap();
        fs::write(root.join("notes.md"), "1 ignored by glob\n").unwrap();

        let config = CorpusConfig {
            text_dir: root,
            include_globs: vec!["**/*.txt".to_string()],
            exclude_globs: Vec::new(),
        };
        (tmp, TextDirSource::new(config, Chunker::default()))
    }

    #[test]
    fn test_parse_paper_meta() {
        let meta = parse_paper_meta("9618_s23_ms_12").unwrap();
        assert_eq!(meta.subject_code, "9618");
        assert_eq!(meta.session, "s");
        assert_eq!(meta.year, 2023);
        assert_eq!(meta.doc_type, DocType::MarkScheme);
        assert_eq!(meta.paper_code, "12");
        assert!(parse_paper_meta("lecture-notes").is_none());
    }

    #[test]
    fn test_doc_type_for_stem() {
        assert_eq!(doc_type_for_stem("9618_W22_QP_31"), DocType::QuestionPaper);
        assert_eq!(doc_type_for_stem("physics_ms_paper2"), DocType::MarkScheme);
        assert_eq!(doc_type_for_stem("random"), DocType::QuestionPaper);
    }

    #[tokio::test]
    async fn test_lists_mark_schemes_only_by_default() {
        let (_tmp, source) = setup();
        let chunks = source.list_chunks(&ListOptions::default()).await.unwrap();
        assert!(chunks.iter().all(|c| c.doc_type == DocType::MarkScheme));
        let docs: Vec<&str> = chunks.iter().map(|c| c.source_document_id.as_str()).collect();
        assert!(docs.contains(&"computer-science/9618_s23_ms_12"));
        assert!(docs.contains(&"9700_w22_ms_21"));
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_include_qp_adds_question_papers() {
        let (_tmp, source) = setup();
        let opts = ListOptions {
            include_qp: true,
            ..Default::default()
        };
        let chunks = source.list_chunks(&opts).await.unwrap();
        assert!(chunks.iter().any(|c| c.doc_type == DocType::QuestionPaper));
        assert_eq!(chunks.len(), 4);
    }

    #[tokio::test]
    async fn test_subject_filter() {
        let (_tmp, source) = setup();
        let by_dir = ListOptions {
            subject: Some("Computer-Science"),
            ..Default::default()
        };
        let chunks = source.list_chunks(&by_dir).await.unwrap();
        assert_eq!(chunks.len(), 2);

        let by_code = ListOptions {
            subject: Some("9700"),
            ..Default::default()
        };
        let chunks = source.list_chunks(&by_code).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("mitochondria"));
    }

    #[tokio::test]
    async fn test_missing_dir_is_error() {
        let config = CorpusConfig {
            text_dir: "/definitely/not/here".into(),
            include_globs: vec!["**/*.txt".to_string()],
            exclude_globs: Vec::new(),
        };
        let source = TextDirSource::new(config, Chunker::default());
        assert!(source.list_chunks(&ListOptions::default()).await.is_err());
    }
}
