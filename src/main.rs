//! # GRC Assist CLI (`grca`)
//!
//! The `grca` binary exposes the retrieval-augmented compliance
//! assistant on the command line.
//!
//! ## Usage
//!
//! ```bash
//! grca --config ./config/grca.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grca init` | Build the index from the corpus and write the snapshot |
//! | `grca search "<query>"` | Rank indexed documents against a query |
//! | `grca ask "<question>"` | One-shot grounded answer with cited sources |
//! | `grca chat` | Interactive conversation over stdin |
//! | `grca status` | Orchestrator state and index size |
//!
//! The provider API key is read from the `GEMINI_API_KEY` environment
//! variable. When the config file is absent, built-in defaults apply.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use grc_assist::config::{self, Config};
use grc_assist::service::RagOrchestrator;
use grc_assist::session::AssistantSession;

/// GRC Assist — a retrieval-augmented compliance assistant.
#[derive(Parser)]
#[command(
    name = "grca",
    about = "GRC Assist — retrieval-augmented compliance question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/grca.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the corpus and write the snapshot.
    ///
    /// Embeds every corpus document through the configured provider, so
    /// this needs `GEMINI_API_KEY` and network access.
    Init,

    /// Rank indexed documents against a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 3)]
        k: usize,
    },

    /// Ask one question and print the grounded answer with sources.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start an interactive conversation on stdin/stdout.
    Chat,

    /// Show the orchestrator state and index size.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Search { query, k } => run_search(&config, &query, k).await,
        Commands::Ask { question } => run_ask(&config, &question).await,
        Commands::Chat => run_chat(&config).await,
        Commands::Status => run_status(&config).await,
    }
}

fn load_or_default(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        config::from_env()
    }
}

async fn build_orchestrator(config: &Config) -> Result<Arc<RagOrchestrator>> {
    let orchestrator =
        Arc::new(RagOrchestrator::from_config(config).context("failed to create service")?);
    orchestrator
        .ensure_ready()
        .await
        .context("initialization failed")?;
    Ok(orchestrator)
}

async fn run_init(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    match config.snapshot.path.as_deref() {
        Some(path) => {
            orchestrator.save_snapshot()?;
            println!(
                "indexed {} documents, snapshot written to {}",
                orchestrator.index_len().unwrap_or(0),
                path.display()
            );
        }
        None => {
            println!(
                "indexed {} documents (no snapshot path configured)",
                orchestrator.index_len().unwrap_or(0)
            );
        }
    }
    Ok(())
}

async fn run_search(config: &Config, query: &str, k: usize) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let results = orchestrator.retrieve(query, k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let doc = &result.document.document;
        println!(
            "{}. [{:.3}] {}",
            i + 1,
            result.score,
            doc.source_name().unwrap_or("Unknown Source")
        );
        println!("    {}", doc.content.replace('\n', " "));
    }
    Ok(())
}

async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let response = orchestrator.query(question).await?;

    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            println!("  - {}", source.name);
        }
    }
    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let mut session = AssistantSession::new();

    println!("Compliance assistant ready. Empty line to exit.");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }

        if let Some(reply) = session.send(&orchestrator, &line).await {
            println!("{}", reply.content);
            if !reply.sources.is_empty() {
                let names: Vec<&str> = reply.sources.iter().map(|s| s.name.as_str()).collect();
                println!("[sources: {}]", names.join(", "));
            }
        }
    }
    Ok(())
}

async fn run_status(config: &Config) -> Result<()> {
    match build_orchestrator(config).await {
        Ok(orchestrator) => {
            println!("state: {:?}", orchestrator.state());
            println!("indexed documents: {}", orchestrator.index_len().unwrap_or(0));
        }
        Err(e) => {
            println!("state: Failed");
            println!("error: {:#}", e);
        }
    }
    Ok(())
}
