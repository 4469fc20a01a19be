//! Credential resolution and API-key hygiene.

use crate::llm::provider_types::ProviderKind;
use std::collections::HashMap;

/// Read-only source of provider settings (API keys, model overrides).
///
/// Production backs this with the site settings table; the CLI maps setting
/// keys to environment variables and tests use [`StaticCredentialStore`].
pub trait CredentialStore: Send + Sync {
    /// Fetch a raw setting value by key, e.g. `groq_api_key`.
    fn get(&self, key: &str) -> Option<String>;
}

/// A resolved, format-checked credential for one provider.
#[derive(Debug, Clone)]
pub struct ProviderCredential {
    pub api_key: String,
    /// Model override from settings, if any; adapters normalize it.
    pub model: Option<String>,
}

/// Why a provider credential is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialFault {
    Missing,
    Malformed { expected: String },
}

/// Resolve and format-check the credential for `kind`.
///
/// Blank values count as missing. A key that does not match the provider's
/// documented shape is reported as malformed, never passed upstream.
pub fn resolve(
    store: &dyn CredentialStore,
    kind: ProviderKind,
) -> Result<ProviderCredential, CredentialFault> {
    let api_key = store
        .get(&kind.settings_key_api())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    let Some(api_key) = api_key else {
        return Err(CredentialFault::Missing);
    };
    if !kind.key_matches(&api_key) {
        return Err(CredentialFault::Malformed {
            expected: kind.key_format().to_string(),
        });
    }
    let model = store
        .get(&kind.settings_key_model())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    Ok(ProviderCredential { api_key, model })
}

/// Mask an API key for display: first and last four characters survive.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// Configuration state of one provider, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Ready {
        masked_key: String,
        model: Option<String>,
    },
    Missing,
    Malformed {
        expected: String,
    },
}

/// Enumerate the credential status of every provider. Keys are masked.
pub fn provider_status(store: &dyn CredentialStore) -> Vec<(ProviderKind, CredentialStatus)> {
    ProviderKind::ALL
        .iter()
        .map(|kind| {
            let status = match resolve(store, *kind) {
                Ok(credential) => CredentialStatus::Ready {
                    masked_key: mask_api_key(&credential.api_key),
                    model: credential.model,
                },
                Err(CredentialFault::Missing) => CredentialStatus::Missing,
                Err(CredentialFault::Malformed { expected }) => {
                    CredentialStatus::Malformed { expected }
                }
            };
            (*kind, status)
        })
        .collect()
}

/// Fixed map of settings, for tests and embedders with config in hand.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    values: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl CredentialStore for StaticCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
