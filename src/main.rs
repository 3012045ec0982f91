//! # msfind CLI
//!
//! ## Usage
//!
//! ```bash
//! msfind --config ./config/msfind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `msfind rebuild-index` | Chunk the corpus and write a fresh index snapshot |
//! | `msfind query "<question>"` | Retrieve passages and print a formatted answer |
//! | `msfind stats` | Summarize the saved snapshot |
//!
//! ## Examples
//!
//! ```bash
//! # Index mark schemes from the text directory
//! msfind rebuild-index
//!
//! # Index question papers as well
//! msfind rebuild-index --include-qp
//!
//! # Ask a question, narrowed to question 2 (a)
//! msfind query "Explain the role of the ALU (4)" --question-id "2 (a)"
//!
//! # Query the remote store directly for one subject
//! msfind query "Describe osmosis" --remote --subject Biology --json
//! ```
//!
//! Logging goes to stderr and defaults to `msfind=info`; set `RUST_LOG` to
//! change it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use msfind::config::{self, Config};
use msfind::query::{self, QueryOptions};
use msfind::rebuild::{self, RebuildOptions};
use msfind::stats;

const DEFAULT_CONFIG_PATH: &str = "./config/msfind.toml";

/// Mark-scheme passage retrieval for exam questions.
#[derive(Parser)]
#[command(
    name = "msfind",
    about = "Retrieve mark-scheme passages for exam questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/msfind.toml`; when that file is absent the
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `[index].path`.
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fresh index snapshot and replace the saved one.
    RebuildIndex {
        /// Index question papers as well as mark schemes.
        #[arg(long)]
        include_qp: bool,

        /// Read text from the remote store instead of the text directory.
        #[arg(long)]
        remote: bool,

        /// Restrict to one subject.
        #[arg(long)]
        subject: Option<String>,
    },

    /// Retrieve passages for a question and print an answer.
    Query {
        /// The question text.
        question: String,

        /// Number of passages to retrieve.
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Only consider chunks labelled with this question ID, e.g. "2 (a)".
        #[arg(long)]
        question_id: Option<String>,

        /// Build an in-memory index from the remote store.
        #[arg(long)]
        remote: bool,

        /// Restrict to one subject (remote only).
        #[arg(long)]
        subject: Option<String>,

        /// Include question-paper chunks as candidates.
        #[arg(long)]
        include_qp: bool,

        /// Print ranked results as JSON.
        #[arg(long)]
        json: bool,

        /// Print the retrieved passages and their scores.
        #[arg(long)]
        debug: bool,
    },

    /// Show index statistics.
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("msfind=info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => Config::default(),
    };
    if let Some(index) = &cli.index {
        cfg.index.path = index.clone();
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    match &cli.command {
        Commands::RebuildIndex {
            include_qp,
            remote,
            subject,
        } => {
            let opts = RebuildOptions {
                include_qp: *include_qp,
                remote: *remote,
                subject: subject.as_deref(),
            };
            rebuild::run_rebuild_index(&cfg, &opts).await?;
        }
        Commands::Query {
            question,
            k,
            question_id,
            remote,
            subject,
            include_qp,
            json,
            debug,
        } => {
            let opts = QueryOptions {
                k: *k,
                question_id: question_id.as_deref(),
                remote: *remote,
                subject: subject.as_deref(),
                include_qp: *include_qp,
                json: *json,
                debug: *debug,
                ..QueryOptions::new(question)
            };
            query::run_query(&cfg, &opts).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
    }

    Ok(())
}
