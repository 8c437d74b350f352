//! # docchat
//!
//! Index a folder of documents and ask questions about it.
//!
//! Usage:
//!   docchat build --dir ./docs           # chunk, embed and persist the index
//!   docchat ask "How do I get started?"  # one-shot question
//!   docchat chat --log chats.json        # interactive session, transcript appended on exit

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use docchat_rag::RagConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = if cli.verbose { "docchat_rag=debug,docchat=debug" } else { "docchat_rag=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = RagConfig::from_env()?;
    if let Some(index) = cli.index {
        config.index_path = index;
    }

    let store = commands::open_store(&config, &cli.embedding)?;

    match cli.command {
        Command::Build { dir, files } => commands::build(&store, dir.as_deref(), &files).await,
        Command::Ask { question } => {
            let orchestrator = commands::orchestrator(&config, store, &cli.generation)?;
            commands::ask(&orchestrator, &question.join(" ")).await
        }
        Command::Chat { log } => {
            let orchestrator = commands::orchestrator(&config, store, &cli.generation)?;
            commands::chat(orchestrator, log.as_deref()).await
        }
    }
}
