//! # ragkit CLI
//!
//! Command-line interface for the retrieval pipeline. All commands accept
//! a `--config` flag pointing to a TOML configuration file; see
//! `config/ragkit.example.toml`.
//!
//! ```bash
//! ragkit ingest                         # build and persist the index
//! ragkit search "python experience"     # print ranked chunks
//! ragkit prompt "what did you build?"   # print the assembled prompt
//! ragkit stats                          # loaded-index statistics
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ragkit::config::{load_config, Config};
use ragkit::index::VectorIndex;
use ragkit::ingest::run_ingest;
use ragkit::prompt::PromptBuilder;
use ragkit::retrieve::Retriever;

/// ragkit — chunking, embedding, vector search, and grounded prompt
/// assembly for retrieval-augmented question answering.
#[derive(Parser)]
#[command(
    name = "ragkit",
    about = "A retrieval-augmented generation core: ingest documents, search them, assemble grounded prompts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragkit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the knowledge directory.
    ///
    /// Scans `knowledge.root` for JSON documents, chunks and embeds them,
    /// and persists the index to `index.dir`. All-or-nothing: a failed
    /// run never replaces a previously good index.
    Ingest {
        /// Report document and chunk counts without embedding or persisting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the most relevant chunks for a query.
    Search {
        /// Query text.
        query: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<i64>,
    },

    /// Retrieve context and print the assembled completion prompt.
    ///
    /// The completion call itself is out of scope; this prints exactly
    /// what a serving layer would send, plus the sources list.
    Prompt {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<i64>,
    },

    /// Show statistics for the persisted index.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => cmd_ingest(&config, dry_run).await,
        Commands::Search { query, top_k } => cmd_search(&config, &query, top_k).await,
        Commands::Prompt { question, top_k } => cmd_prompt(&config, &question, top_k).await,
        Commands::Stats => cmd_stats(&config),
    }
}

async fn cmd_ingest(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let stats = run_ingest(config, dry_run).await?;

    if dry_run {
        println!("ingest (dry-run)");
    } else {
        println!("ingest");
    }
    println!("  files: {}", stats.files);
    println!("  documents: {}", stats.documents);
    println!("  chunks: {}", stats.chunks);
    println!("  dimension: {}", stats.dims);
    if !dry_run {
        println!("  index: {}", config.index.dir.display());
    }
    println!("ok");
    Ok(())
}

fn load_index(config: &Config) -> anyhow::Result<Arc<VectorIndex>> {
    let index = VectorIndex::load(&config.index.dir)
        .with_context(|| "No usable index. Run `ragkit ingest` first.")?;
    Ok(Arc::new(index))
}

async fn cmd_search(config: &Config, query: &str, top_k: Option<i64>) -> anyhow::Result<()> {
    let index = load_index(config)?;
    let retriever = Retriever::new(index, config.embedding.clone());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let results = retriever.retrieve(query, top_k).await?;

    if results.is_empty() {
        println!("no results (index is empty)");
        return Ok(());
    }

    println!("results: {}", results.len());
    for r in &results {
        println!(
            "{}. [{:.3}] {} ({})",
            r.rank + 1,
            r.score,
            r.chunk.title,
            r.chunk.source
        );
        println!("   {}", excerpt(&r.chunk.text, 160));
    }
    Ok(())
}

async fn cmd_prompt(config: &Config, question: &str, top_k: Option<i64>) -> anyhow::Result<()> {
    let index = load_index(config)?;
    let retriever = Retriever::new(index, config.embedding.clone());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let chunks = retriever.retrieve(question, top_k).await?;
    let builder = PromptBuilder::new(config.prompt.clone());
    let output = builder.build(question, &[], &chunks);

    println!("{}", output.prompt);
    println!();
    if output.sources.is_empty() {
        println!("Sources: none");
    } else {
        println!("Sources:");
        for source in &output.sources {
            println!("- {} ({})", source.title, source.source);
        }
    }
    Ok(())
}

fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let index = load_index(config)?;

    let documents: HashSet<&str> = index
        .chunks()
        .iter()
        .map(|c| c.document_id.as_str())
        .collect();

    println!("index: {}", config.index.dir.display());
    println!("  chunks: {}", index.len());
    println!("  documents: {}", documents.len());
    println!("  dimension: {}", index.dims());
    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
