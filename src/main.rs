mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sema::config::SemaConfig;

#[derive(Parser)]
#[command(name = "sema", version, about = "Semantic retrieval over a knowledge corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a corpus file and print the most similar documents
    Query {
        /// Path to the corpus JSON file
        corpus: PathBuf,
        /// Natural-language query
        query: String,
        /// Number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Index a corpus file and stream a grounded LLM answer
    Ask {
        /// Path to the corpus JSON file
        corpus: PathBuf,
        /// Question to answer from the corpus
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config_path = sema::config::default_config_path();
    let config = SemaConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for results and answers.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !config_path.exists() {
        tracing::info!("no config file at {}, using defaults", config_path.display());
    }

    match cli.command {
        Command::Query {
            corpus,
            query,
            top_k,
        } => {
            cli::query::query(&config, &corpus, &query, top_k).await?;
        }
        Command::Ask { corpus, question } => {
            cli::ask::ask(&config, &corpus, &question).await?;
        }
    }

    Ok(())
}
