//! # Transcript QA CLI (`tqa`)
//!
//! Ask questions about a therapy-session transcript from the command line,
//! or serve the HTTP API used by the web client.
//!
//! ## Usage
//!
//! ```bash
//! tqa --config ./config/tqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tqa init` | Create the SQLite database and check the transcript parses |
//! | `tqa transcript` | List parsed utterances |
//! | `tqa ask "<question>"` | Answer a question and record it in history |
//! | `tqa retrieve "<question>"` | Show the chunks retrieval ranks highest |
//! | `tqa history` | Recent questions, newest first |
//! | `tqa stats` | Usage statistics |
//! | `tqa serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use transcript_qa::{ask, config, logging, migrate, server, stats};

/// Transcript QA CLI: retrieval-augmented question answering over a
/// therapy-session transcript.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tqa",
    about = "Transcript QA: ask questions about a therapy-session transcript",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the history table, then parses
    /// the transcript and reports how many utterances it holds.
    /// This command is idempotent; running it multiple times is safe.
    Init,

    /// List the parsed transcript.
    Transcript,

    /// Answer a question about the transcript.
    Ask {
        /// The question to answer.
        question: String,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the chunks retrieved for a question, without generating an answer.
    Retrieve {
        /// The question to retrieve context for.
        question: String,

        /// Number of chunks to return (default: `[retrieval] debug_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// List recent questions and answers.
    History {
        /// Maximum records to show (default: `[history] default_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show usage statistics.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to `[server] bind`, indexes the transcript and serves
    /// the question, history and analytics endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(match cli.command {
        Commands::Serve => "info",
        _ => "warn",
    });

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
            match std::fs::read_to_string(&cfg.transcript.path) {
                Ok(raw) => {
                    let count = transcript_qa_core::transcript::parse(&raw).len();
                    println!(
                        "Transcript {}: {} utterances.",
                        cfg.transcript.path.display(),
                        count
                    );
                }
                Err(e) => {
                    println!(
                        "Warning: cannot read transcript {}: {}",
                        cfg.transcript.path.display(),
                        e
                    );
                }
            }
        }
        Commands::Transcript => {
            ask::run_transcript(&cfg).await?;
        }
        Commands::Ask { question, json } => {
            ask::run_ask(&cfg, &question, json).await?;
        }
        Commands::Retrieve { question, k } => {
            ask::run_retrieve(&cfg, &question, k).await?;
        }
        Commands::History { limit } => {
            stats::run_history(&cfg, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
