//! # Text-to-SQL CLI (`t2s`)
//!
//! ## Usage
//!
//! ```bash
//! t2s [--config ./config/t2s.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `t2s serve` | Start the HTTP API |
//! | `t2s ask --schema <file> "<question>"` | Convert one question and print the SQL |
//! | `t2s chunks --schema <file>` | Print the fragments a schema is split into |
//! | `t2s prompt --schema <file> "<question>"` | Print the prompt a question would be sent with |
//!
//! `ask` and `prompt` read the API key from `OPENAI_API_KEY`. Log verbosity
//! is controlled with `RUST_LOG` (e.g. `RUST_LOG=text2sql=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use text2sql::config::{self, Config};
use text2sql::{ask, inspect, server};

/// Natural-language to SQL over a retrieval-augmented schema index.
#[derive(Parser)]
#[command(
    name = "t2s",
    about = "Convert natural-language questions into SQL using a schema index and an LLM",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve,

    /// Convert a single question to SQL.
    Ask {
        /// JSON schema file: an array of table descriptions.
        #[arg(long)]
        schema: PathBuf,

        /// The question to convert.
        question: String,
    },

    /// Show how a schema file is split into fragments.
    Chunks {
        #[arg(long)]
        schema: PathBuf,
    },

    /// Show the prompt that would be sent for a question.
    Prompt {
        #[arg(long)]
        schema: PathBuf,

        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            let cfg = Config::default();
            cfg.validate()?;
            cfg
        }
    };

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { schema, question } => {
            let credential = ask::credential_from_env()?;
            ask::run_ask(&cfg, &schema, &question, credential).await?;
        }
        Commands::Chunks { schema } => {
            inspect::run_chunks(&cfg, &schema)?;
        }
        Commands::Prompt { schema, question } => {
            let credential = ask::credential_from_env()?;
            inspect::run_prompt(&cfg, &schema, &question, credential).await?;
        }
    }

    Ok(())
}
