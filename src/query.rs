//! `msfind query`: retrieve mark-scheme passages for a question and format
//! an answer from them.

use anyhow::Result;
use serde::Serialize;

use msfind_core::search::{search, QueryRequest, RankedResult};
use msfind_core::source::ListOptions;

use crate::answer::{detect_command_word, detect_marks, format_answer, CommandWord, FormattedAnswer};
use crate::config::Config;
use crate::sources;

const NO_MATCH: &str = "No relevant passages found.";

#[derive(Debug, Clone)]
pub struct QueryOptions<'a> {
    pub question: &'a str,
    /// Overrides `[retrieval].top_k`.
    pub k: Option<usize>,
    pub question_id: Option<&'a str>,
    pub remote: bool,
    pub subject: Option<&'a str>,
    pub include_qp: bool,
    pub json: bool,
    pub debug: bool,
}

impl<'a> QueryOptions<'a> {
    pub fn new(question: &'a str) -> Self {
        Self {
            question,
            k: None,
            question_id: None,
            remote: false,
            subject: None,
            include_qp: false,
            json: false,
            debug: false,
        }
    }
}

#[derive(Serialize)]
struct QueryResponse<'r, 's> {
    question: &'r str,
    command_word: CommandWord,
    marks: Option<u32>,
    results: &'r RankedResult<'s>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<FormattedAnswer>,
}

pub async fn run_query(config: &Config, opts: &QueryOptions<'_>) -> Result<()> {
    let include_qp = opts.include_qp || config.index.include_qp;
    let source = sources::query_source(config, opts.remote)?;
    let list_opts = ListOptions {
        subject: opts.subject,
        include_qp,
        page_size: sources::page_size(config),
    };
    let snapshot = source
        .snapshot(&config.chunking.index_builder(), &list_opts)
        .await?;

    let request = QueryRequest {
        question: opts.question,
        k: opts.k.unwrap_or(config.retrieval.top_k),
        question_id: opts.question_id,
        expand_acronyms: config.retrieval.expand_acronyms,
    };
    let results = search(&snapshot, &request);

    let command_word = detect_command_word(opts.question);
    let marks = detect_marks(opts.question);
    let answer = if results.is_empty() {
        None
    } else {
        Some(format_answer(command_word, marks, &results.texts()))
    };

    if opts.json {
        let response = QueryResponse {
            question: opts.question,
            command_word,
            marks,
            results: &results,
            answer,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let Some(answer) = answer else {
        println!("{}", NO_MATCH);
        return Ok(());
    };

    println!("Exact Answer:");
    println!("{}", answer.exact_answer);
    println!();
    println!("Short Explanation:");
    println!("{}", answer.short_explanation);

    if opts.debug {
        print_debug(&results, command_word, marks, source.name());
    }
    Ok(())
}

fn print_debug(results: &RankedResult<'_>, command_word: CommandWord, marks: Option<u32>, source: &str) {
    println!();
    println!("--- debug ---");
    println!("source: {}", source);
    println!("command word: {}", command_word);
    match marks {
        Some(m) => println!("marks: {}", m),
        None => println!("marks: -"),
    }
    for (rank, item) in results.iter().enumerate() {
        let preview: String = item.chunk.text.chars().take(200).collect();
        println!();
        println!(
            "{}. [{:.4}] {} ({}) qid={}",
            rank + 1,
            item.score,
            item.chunk.chunk_id,
            item.chunk.doc_type,
            item.chunk.question_id.as_deref().unwrap_or("-")
        );
        println!("   {}", preview.replace('\n', " "));
    }
}
