//! Remote text store source.
//!
//! Reads extracted paper text from a PostgREST-style API (as exposed by
//! Supabase) and chunks it in memory. Nothing fetched here is persisted;
//! queries run against an on-demand snapshot.
//!
//! # Tables
//!
//! | Table | Columns used |
//! |-------|--------------|
//! | `paper_texts` | `id`, `paper_id`, `text_content` |
//! | `papers` | `id`, `subject_id`, `year`, `session`, `paper_code`, `paper_type` |
//! | `subjects` | `id`, `name` |
//!
//! `paper_texts` is read in pages ordered by `id` (`limit`/`offset`), then
//! the referenced papers and subjects are fetched in batches of 100 IDs.
//!
//! # Environment Variables
//!
//! The service key is read from the variable named by
//! `[remote].service_key_env` (default `MSFIND_REMOTE_KEY`) and sent as both
//! the `apikey` header and a bearer token. Requests are not retried.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use msfind_core::chunk::Chunker;
use msfind_core::models::SourceDocument;
use msfind_core::source::{ChunkSource, ListOptions};
use msfind_core::{Chunk, DocType};

use crate::config::RemoteConfig;

/// IDs per `in.(...)` filter request.
const ID_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PaperTextRow {
    pub id: i64,
    pub paper_id: i64,
    #[serde(default)]
    pub text_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaperRow {
    pub id: i64,
    #[serde(default)]
    pub subject_id: Option<i64>,
    #[serde(default)]
    pub year: serde_json::Value,
    #[serde(default)]
    pub session: serde_json::Value,
    #[serde(default)]
    pub paper_code: serde_json::Value,
    pub paper_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRow {
    pub id: i64,
    pub name: String,
}

pub struct RemoteTextSource {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    chunker: Chunker,
}

impl RemoteTextSource {
    pub fn from_config(config: &RemoteConfig, chunker: Chunker) -> Result<Self> {
        let service_key = std::env::var(&config.service_key_env)
            .with_context(|| format!("{} is not set", config.service_key_env))?;
        if service_key.trim().is_empty() {
            bail!("{} is empty", config.service_key_env);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: service_key.trim().to_string(),
            chunker,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let resp = self
            .client
            .get(self.rest_url(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to query remote table '{}'", table))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "Remote query on '{}' failed (HTTP {}): {}",
                table,
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(resp.json().await?)
    }

    async fn fetch_paper_texts(&self, page_size: usize) -> Result<Vec<PaperTextRow>> {
        let page_size = page_size.max(1);
        let mut rows = Vec::new();
        let mut offset = 0usize;
        loop {
            let batch: Vec<PaperTextRow> = self
                .get_rows(
                    "paper_texts",
                    &[
                        ("select", "id,paper_id,text_content".to_string()),
                        ("order", "id.asc".to_string()),
                        ("limit", page_size.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;
            if batch.is_empty() {
                break;
            }
            offset += batch.len();
            debug!(fetched = offset, "paper_texts page");
            rows.extend(batch);
        }
        Ok(rows)
    }

    async fn fetch_papers(&self, ids: &[i64]) -> Result<HashMap<i64, PaperRow>> {
        let mut papers = HashMap::new();
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let rows: Vec<PaperRow> = self
                .get_rows(
                    "papers",
                    &[
                        (
                            "select",
                            "id,subject_id,year,session,paper_code,paper_type".to_string(),
                        ),
                        ("id", in_filter(batch)),
                    ],
                )
                .await?;
            papers.extend(rows.into_iter().map(|p| (p.id, p)));
        }
        Ok(papers)
    }

    async fn fetch_subject_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        let mut names = HashMap::new();
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let rows: Vec<SubjectRow> = self
                .get_rows(
                    "subjects",
                    &[("select", "id,name".to_string()), ("id", in_filter(batch))],
                )
                .await?;
            names.extend(rows.into_iter().map(|s| (s.id, s.name)));
        }
        Ok(names)
    }
}

#[async_trait]
impl ChunkSource for RemoteTextSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn list_chunks(&self, opts: &ListOptions<'_>) -> Result<Vec<Chunk>> {
        let text_rows = self.fetch_paper_texts(opts.page_size).await?;
        if text_rows.is_empty() {
            warn!("remote table paper_texts is empty");
            return Ok(Vec::new());
        }

        let paper_ids: Vec<i64> = text_rows
            .iter()
            .map(|r| r.paper_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let papers = self.fetch_papers(&paper_ids).await?;

        let subject_ids: Vec<i64> = papers
            .values()
            .filter_map(|p| p.subject_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let subjects = self.fetch_subject_names(&subject_ids).await?;

        let docs = collect_documents(&text_rows, &papers, &subjects, opts);
        info!(
            rows = text_rows.len(),
            documents = docs.len(),
            "fetched remote paper texts"
        );

        let chunks = chunk_documents(&self.chunker, &docs);
        if chunks.is_empty() {
            warn!(
                subject = opts.subject.unwrap_or("*"),
                include_qp = opts.include_qp,
                "no remote paper texts match the selected filters"
            );
        }
        Ok(chunks)
    }
}

/// Join text rows with their paper and subject, applying the type and
/// subject filters. Rows whose paper is missing or whose text is blank are
/// skipped.
pub fn collect_documents(
    text_rows: &[PaperTextRow],
    papers: &HashMap<i64, PaperRow>,
    subjects: &HashMap<i64, String>,
    opts: &ListOptions<'_>,
) -> Vec<SourceDocument> {
    let subject_filter = opts.subject.map(|s| s.trim().to_lowercase());

    text_rows
        .iter()
        .filter_map(|row| {
            let paper = papers.get(&row.paper_id)?;
            let doc_type = DocType::from_code(&paper.paper_type);
            if !doc_type.is_included(opts.include_qp) {
                return None;
            }

            let subject_name = paper
                .subject_id
                .and_then(|id| subjects.get(&id))
                .map(String::as_str);
            if let Some(wanted) = &subject_filter {
                if subject_name.map(|n| n.trim().to_lowercase()).as_deref() != Some(wanted.as_str()) {
                    return None;
                }
            }

            let text = row.text_content.as_deref().unwrap_or("").trim();
            if text.is_empty() {
                return None;
            }

            Some(SourceDocument {
                source_document_id: document_id(paper, subject_name),
                doc_type,
                text: text.to_string(),
            })
        })
        .collect()
}

pub fn chunk_documents(chunker: &Chunker, docs: &[SourceDocument]) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|d| chunker.chunk(&d.text, d.doc_type, &d.source_document_id))
        .collect()
}

/// `{subject}_{year}_{session}_{paper_type}_{paper_code}`, with the subject
/// lowercased and spaces replaced by hyphens.
pub fn document_id(paper: &PaperRow, subject_name: Option<&str>) -> String {
    let subject = subject_name
        .unwrap_or("subject")
        .trim()
        .to_lowercase()
        .replace(' ', "-");
    format!(
        "{}_{}_{}_{}_{}",
        subject,
        scalar(&paper.year),
        scalar(&paper.session),
        paper.paper_type.to_lowercase(),
        scalar(&paper.paper_code)
    )
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn in_filter(ids: &[i64]) -> String {
    let csv = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", csv)
}
