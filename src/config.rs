//! TOML configuration.
//!
//! ```toml
//! [index]
//! path = "data/index/snapshot.json"
//! include_qp = false
//!
//! [chunking]
//! max_chunk_chars = 800
//! overlap_chars = 120
//! min_token_len = 2
//! extra_stopwords = ["marks"]
//!
//! [retrieval]
//! top_k = 3
//! expand_acronyms = false
//!
//! [corpus]
//! text_dir = "data/text"
//! include_globs = ["**/*.txt"]
//!
//! [remote]
//! url = "https://example.supabase.co"
//! service_key_env = "MSFIND_REMOTE_KEY"
//! page_size = 500
//! ```
//!
//! Every section is optional; omitted values take the defaults above.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use msfind_core::chunk::{Chunker, DEFAULT_MAX_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS};
use msfind_core::tokenize::{Tokenizer, DEFAULT_MIN_TOKEN_LEN};
use msfind_core::IndexBuilder;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub include_qp: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            include_qp: false,
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/index/snapshot.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Overlap between pieces of a hard-split paragraph, capped below
    /// `max_chunk_chars`.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
            min_token_len: default_min_token_len(),
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}
fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}
fn default_min_token_len() -> usize {
    DEFAULT_MIN_TOKEN_LEN
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Chunker {
        Chunker::new(self.max_chunk_chars).with_overlap_chars(self.overlap_chars)
    }

    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.min_token_len, &self.extra_stopwords)
    }

    pub fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.tokenizer())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub expand_acronyms: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            expand_acronyms: false,
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_text_dir")]
    pub text_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            text_dir: default_text_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_text_dir() -> PathBuf {
    PathBuf::from("data/text")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// Base URL of the REST text store (without `/rest/v1`).
    pub url: String,
    /// Environment variable holding the service key.
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_service_key_env() -> String {
    "MSFIND_REMOTE_KEY".to_string()
}
pub const DEFAULT_PAGE_SIZE: usize = 500;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chunk_chars == 0 {
        bail!("chunking.max_chunk_chars must be > 0");
    }
    if config.chunking.min_token_len == 0 {
        bail!("chunking.min_token_len must be >= 1");
    }
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if let Some(remote) = &config.remote {
        if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
            bail!("remote.url must start with http:// or https://");
        }
        if remote.page_size == 0 {
            bail!("remote.page_size must be > 0");
        }
        if remote.service_key_env.trim().is_empty() {
            bail!("remote.service_key_env must not be empty");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.index.path, PathBuf::from("data/index/snapshot.json"));
        assert!(!cfg.index.include_qp);
        assert_eq!(cfg.chunking.max_chunk_chars, 800);
        assert_eq!(cfg.chunking.overlap_chars, 120);
        assert_eq!(cfg.chunking.min_token_len, 2);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.corpus.include_globs, vec!["**/*.txt"]);
        assert!(cfg.remote.is_none());
    }

    #[test]
    fn test_remote_defaults() {
        let cfg = parse("[remote]\nurl = \"https://db.example.com\"\n").unwrap();
        let remote = cfg.remote.unwrap();
        assert_eq!(remote.service_key_env, "MSFIND_REMOTE_KEY");
        assert_eq!(remote.page_size, 500);
        assert_eq!(remote.timeout_secs, 30);
    }

    #[test]
    fn test_overlap_flows_into_chunker() {
        let small = parse("[chunking]\nmax_chunk_chars = 100\n").unwrap();
        assert_eq!(small.chunking.chunker().overlap_chars, 99);
        let cfg = parse("[chunking]\nmax_chunk_chars = 100\noverlap_chars = 20\n").unwrap();
        assert_eq!(cfg.chunking.chunker().overlap_chars, 20);
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_rejects_bad_remote_url() {
        assert!(parse("[remote]\nurl = \"db.example.com\"\n").is_err());
    }

    #[test]
    fn test_tokenizer_from_chunking() {
        let cfg = parse("[chunking]\nmin_token_len = 3\nextra_stopwords = [\"Marks\"]\n").unwrap();
        let tok = cfg.chunking.tokenizer();
        assert_eq!(tok.min_token_len, 3);
        assert!(tok.is_stopword("marks"));
    }
}
