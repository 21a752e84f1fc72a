//! # DocChat CLI (`docchat`)
//!
//! The `docchat` binary drives the pipeline from the command line: index
//! initialization, PDF ingestion, one-shot questions, an interactive chat
//! session, and index status.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat init` | Create the SQLite index file and schema |
//! | `docchat ingest <pdf>` | Extract, chunk, embed, and index a PDF |
//! | `docchat ask "<question>"` | Answer one question against the index |
//! | `docchat chat` | Interactive session with conversation history |
//! | `docchat status` | Show document and passage counts |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the index
//! docchat init --config ./config/docchat.toml
//!
//! # Ingest a document
//! docchat ingest ./report.pdf --config ./config/docchat.toml
//!
//! # Ask a single question
//! docchat ask "What does chapter 2 cover?" --config ./config/docchat.toml
//!
//! # Ask with more retrieved passages
//! docchat ask "Summarize the findings" --top-k 8
//!
//! # Interactive chat (history carried across questions)
//! docchat chat --config ./config/docchat.toml
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docchat::config;
use docchat::pipeline::Pipeline;

/// DocChat CLI — a chat-driven PDF question answering service with a local
/// vector index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "DocChat — chat-driven PDF question answering over a local vector index",
    version,
    long_about = "DocChat ingests PDF documents into a SQLite-backed vector index (extract, \
    chunk, embed) and answers free-text questions grounded in the most similar passages, \
    carrying conversation history across turns."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docchat.toml`. Store, chunking, retrieval, and
    /// provider settings are read from this file.
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the index.
    ///
    /// Creates the SQLite file and schema (documents, passages, index_meta).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Ingest a PDF into the index.
    ///
    /// Extracts page text, chunks it into overlapping passages, embeds them
    /// with the configured provider, and stores everything in one atomic
    /// batch. Requires `embedding.provider` to be configured.
    Ingest {
        /// Path to the PDF file.
        pdf: PathBuf,
    },

    /// Ask one question against the index.
    ///
    /// Retrieves the most similar passages and generates a grounded answer.
    /// Requires embedding and generation providers unless the index is empty,
    /// in which case a fixed notice is printed.
    Ask {
        /// The question to answer.
        question: String,

        /// Override the number of passages retrieved for grounding.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Interactive chat session.
    ///
    /// Reads questions from stdin and answers them with conversation history
    /// carried across turns. `exit`, `quit`, or end-of-input ends the session.
    Chat,

    /// Show index status.
    ///
    /// Prints document and passage counts and the embedding dimensionality.
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pipeline = Pipeline::from_config(cfg).await?;
            let stats = pipeline.stats().await?;
            println!(
                "Index initialized ({} documents, {} passages).",
                stats.documents, stats.passages
            );
        }
        Commands::Ingest { pdf } => {
            let pipeline = Pipeline::from_config(cfg).await?;
            let handle = pipeline
                .ingest(&pdf)
                .await
                .with_context(|| format!("failed to ingest {}", pdf.display()))?;
            println!(
                "Ingested {} ({} pages, {} passages).",
                handle.document_id, handle.page_count, handle.passage_count
            );
        }
        Commands::Ask { question, top_k } => {
            if let Some(k) = top_k {
                if k < 1 {
                    anyhow::bail!("--top-k must be >= 1");
                }
                cfg.retrieval.top_k = k;
            }
            let pipeline = Pipeline::from_config(cfg).await?;
            let (answer, _history) = pipeline.ask(&question, &[]).await?;
            println!("{}", answer);
        }
        Commands::Chat => {
            let pipeline = Pipeline::from_config(cfg).await?;
            run_chat(&pipeline).await?;
        }
        Commands::Status => {
            let pipeline = Pipeline::from_config(cfg).await?;
            let stats = pipeline.stats().await?;
            println!("Documents: {}", stats.documents);
            println!("Passages:  {}", stats.passages);
            println!("Dims:      {}", stats.dims);
        }
    }

    Ok(())
}

/// Line-based chat loop over stdin, history carried in memory.
async fn run_chat(pipeline: &Pipeline) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut history = Vec::new();

    println!("DocChat interactive session. Type 'exit' to quit.");
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match pipeline.ask(question, &history).await {
            Ok((answer, new_history)) => {
                history = new_history;
                println!("{}", answer);
            }
            Err(e) => {
                eprintln!("error: {}", e);
            }
        }
    }

    Ok(())
}
