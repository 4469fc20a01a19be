//! Provider configuration listing.

use crate::store::EnvCredentialStore;
use anyhow::Result;
use colored::*;
use pandu_core::{CredentialStatus, provider_status};

pub fn execute() -> Result<()> {
    println!("{}", "Provider configuration".bold().underline());
    for (kind, status) in provider_status(&EnvCredentialStore) {
        let env_var = format!("PANDU_{}", kind.settings_key_api().to_uppercase());
        match status {
            CredentialStatus::Ready { masked_key, model } => {
                let model = model.unwrap_or_else(|| "default model".to_string());
                println!(
                    "{} {:<12} {} ({model})",
                    "✓".green().bold(),
                    kind.display_name(),
                    masked_key.green()
                );
            }
            CredentialStatus::Missing => {
                println!(
                    "{} {:<12} {}",
                    "✗".yellow().bold(),
                    kind.display_name(),
                    format!("not configured; set {env_var}").yellow()
                );
            }
            CredentialStatus::Malformed { expected } => {
                println!(
                    "{} {:<12} {}",
                    "✗".red().bold(),
                    kind.display_name(),
                    format!("malformed key in {env_var}; expected {expected}").red()
                );
            }
        }
    }
    Ok(())
}
