//! Pandu CLI
//!
//! One-shot commands against the Pandu orchestration layer:
//!
//! - `pandu ask "Siapa ketua OSIS?"`: answer a text question
//! - `pandu vision foto.jpg --reference "Dewi=dewi.jpg"`: identify a photo
//! - `pandu providers`: show which providers are configured
//!
//! API keys come from the environment (`PANDU_GROQ_API_KEY`,
//! `PANDU_GEMINI_API_KEY`, `PANDU_OPENROUTER_API_KEY`); knowledge records
//! come from a JSON file passed with `--data`.

mod args;
mod commands;
mod knowledge_file;
mod store;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment-based filtering
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ask { question, common } => {
            commands::ask::execute(&question, &common, cli.verbose).await
        }
        Commands::Vision {
            image,
            question,
            references,
            common,
        } => commands::vision::execute(&image, &question, &references, &common, cli.verbose).await,
        Commands::Providers => commands::providers::execute(),
    }
}
