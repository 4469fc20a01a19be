//! Environment-backed credential store.
//!
//! The site stores provider settings in its database; the CLI maps each
//! settings key onto environment variables instead. `groq_api_key` is read
//! from `PANDU_GROQ_API_KEY`, falling back to plain `GROQ_API_KEY`.

use pandu_core::CredentialStore;

/// Candidate environment variable names for a settings key, most specific
/// first.
fn env_names(key: &str) -> [String; 2] {
    let upper = key.to_uppercase();
    [format!("PANDU_{upper}"), upper]
}

/// Resolves provider settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        env_names(key)
            .iter()
            .find_map(|name| std::env::var(name).ok())
    }
}
