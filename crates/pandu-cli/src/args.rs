//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pandu")]
#[command(about = "Pandu - AI assistant for the OSIS content site")]
#[command(
    long_about = r#"Pandu - AI assistant for the OSIS content site

USAGE:
  pandu ask "Siapa ketua OSIS?"                # Answer a text question
  pandu vision foto.jpg                        # Ask about a photo
  pandu vision foto.jpg --reference Dewi=d.jpg # Compare against references
  pandu providers                              # Show provider configuration

CREDENTIALS:
  Set PANDU_GROQ_API_KEY, PANDU_GEMINI_API_KEY and/or
  PANDU_OPENROUTER_API_KEY. At least one valid key is required.

For detailed help: pandu --help"#
)]
#[command(version)]
pub struct Cli {
    /// Show routing and retrieval diagnostics alongside the answer
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a text question using the configured providers
    Ask {
        /// The question to ask
        question: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Answer a question about a photo, optionally comparing reference photos
    Vision {
        /// The photo being asked about
        image: PathBuf,

        /// Question about the photo
        #[arg(long, short, default_value = "Siapa yang ada di foto ini?")]
        question: String,

        /// Labeled reference photo, as NAME=PATH; repeatable
        #[arg(long = "reference", value_name = "NAME=PATH")]
        references: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the credential status of every provider
    Providers,
}

/// Flags shared by the answering commands.
#[derive(Args)]
pub struct CommonArgs {
    /// JSON file of knowledge records to ground answers in
    #[arg(long = "data", env = "PANDU_DATA", value_name = "FILE")]
    pub knowledge: Option<PathBuf>,

    /// Use exactly this provider (groq, gemini, openrouter); no fallback
    #[arg(long)]
    pub provider: Option<String>,

    /// Answer with admin privileges: no redaction, detailed error messages
    #[arg(long)]
    pub admin: bool,

    /// Overall time budget for the provider chain, in seconds
    #[arg(long, value_name = "SECONDS")]
    pub deadline: Option<u64>,
}
