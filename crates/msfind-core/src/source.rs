//! Chunk source abstraction.
//!
//! The query engine only ever sees an [`IndexSnapshot`]. Where that
//! snapshot comes from is decided once, when a [`ChunkSource`] is
//! constructed:
//!
//! | Source | Snapshot |
//! |--------|----------|
//! | [`LocalSnapshotSource`] | the pre-built snapshot loaded from disk |
//! | remote / file-backed sources (app crate) | built on demand from [`list_chunks`](ChunkSource::list_chunks) |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::index::IndexBuilder;
use crate::models::Chunk;
use crate::snapshot::IndexSnapshot;

/// Filters applied when listing chunks.
#[derive(Debug, Clone, Default)]
pub struct ListOptions<'a> {
    /// Exact, case-insensitive subject name. Sources without subject
    /// metadata ignore it.
    pub subject: Option<&'a str>,
    /// Include question-paper chunks as well as mark schemes.
    pub include_qp: bool,
    /// Page size for sources that fetch in pages.
    pub page_size: usize,
}

#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Short label for logs and CLI output (e.g. `"local"`, `"remote"`).
    fn name(&self) -> &str;

    /// Produce the chunks this source currently holds, filtered by `opts`.
    async fn list_chunks(&self, opts: &ListOptions<'_>) -> Result<Vec<Chunk>>;

    /// Produce a queryable snapshot.
    ///
    /// The default builds an in-memory snapshot from
    /// [`list_chunks`](ChunkSource::list_chunks); it is never persisted.
    async fn snapshot(
        &self,
        builder: &IndexBuilder,
        opts: &ListOptions<'_>,
    ) -> Result<Arc<IndexSnapshot>> {
        let chunks = self.list_chunks(opts).await?;
        tracing::info!(
            source = self.name(),
            chunks = chunks.len(),
            "building on-demand index"
        );
        Ok(Arc::new(builder.build(&chunks, opts.include_qp)))
    }
}

/// Serves a pre-built snapshot.
pub struct LocalSnapshotSource {
    snapshot: Arc<IndexSnapshot>,
}

impl LocalSnapshotSource {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl ChunkSource for LocalSnapshotSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_chunks(&self, opts: &ListOptions<'_>) -> Result<Vec<Chunk>> {
        Ok(self
            .snapshot
            .chunks()
            .filter(|c| c.doc_type.is_included(opts.include_qp))
            .cloned()
            .collect())
    }

    /// Returns the stored snapshot as-is when it already holds exactly the
    /// requested candidate set. Asking for question papers from a
    /// mark-scheme-only snapshot also returns it as-is, with a warning.
    /// Otherwise the saved chunks are re-weighted in memory so term
    /// statistics match the requested candidate set.
    async fn snapshot(
        &self,
        _builder: &IndexBuilder,
        opts: &ListOptions<'_>,
    ) -> Result<Arc<IndexSnapshot>> {
        if self.snapshot.include_qp() == opts.include_qp {
            return Ok(Arc::clone(&self.snapshot));
        }
        if opts.include_qp {
            tracing::warn!(
                "question-paper chunks are not in the saved index; rebuild with --include-qp to search them"
            );
            return Ok(Arc::clone(&self.snapshot));
        }
        let chunks = self.list_chunks(opts).await?;
        let builder = IndexBuilder::new(self.snapshot.tokenizer().clone());
        Ok(Arc::new(builder.build(&chunks, opts.include_qp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build;
    use crate::models::DocType;
    use crate::search::query;

    fn mixed() -> Vec<Chunk> {
        vec![
            Chunk::new("ms1", DocType::MarkScheme, 0, None, "the alu performs arithmetic"),
            Chunk::new("ms1", DocType::MarkScheme, 1, None, "the cpu fetches instructions"),
            Chunk::new("qp1", DocType::QuestionPaper, 0, None, "describe the alu register"),
        ]
    }

    struct VecSource(Vec<Chunk>);

    #[async_trait]
    impl ChunkSource for VecSource {
        fn name(&self) -> &str {
            "vec"
        }

        async fn list_chunks(&self, opts: &ListOptions<'_>) -> Result<Vec<Chunk>> {
            Ok(self
                .0
                .iter()
                .filter(|c| c.doc_type.is_included(opts.include_qp))
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_local_source_returns_same_snapshot() {
        let snap = Arc::new(build(&mixed(), true));
        let source = LocalSnapshotSource::new(Arc::clone(&snap));
        let opts = ListOptions {
            include_qp: true,
            ..Default::default()
        };
        let served = source.snapshot(&IndexBuilder::default(), &opts).await.unwrap();
        assert!(Arc::ptr_eq(&snap, &served));
    }

    #[tokio::test]
    async fn test_dropping_qp_removes_question_papers_from_candidates() {
        let source = LocalSnapshotSource::new(Arc::new(build(&mixed(), true)));
        let ms_only = source
            .snapshot(&IndexBuilder::default(), &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(ms_only.len(), 2);
        let result = query(&ms_only, "alu register", 5, None);
        assert!(result
            .iter()
            .all(|r| r.chunk.doc_type == DocType::MarkScheme));
    }

    #[tokio::test]
    async fn test_requesting_qp_from_mark_scheme_index_keeps_snapshot() {
        let snap = Arc::new(build(&mixed(), false));
        let source = LocalSnapshotSource::new(Arc::clone(&snap));
        let opts = ListOptions {
            include_qp: true,
            ..Default::default()
        };
        let served = source.snapshot(&IndexBuilder::default(), &opts).await.unwrap();
        assert!(Arc::ptr_eq(&snap, &served));
        assert!(served
            .chunks()
            .all(|c| c.doc_type == DocType::MarkScheme));
    }

    #[tokio::test]
    async fn test_default_snapshot_builds_from_listed_chunks() {
        let source = VecSource(mixed());
        let snap = source
            .snapshot(&IndexBuilder::default(), &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(snap.len(), 2);
        let result = query(&snap, "What does the ALU do?", 1, None);
        assert_eq!(result.items[0].chunk.chunk_id, "ms1#0");
    }
}
