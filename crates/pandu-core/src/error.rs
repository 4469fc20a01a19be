//! Error taxonomy for the orchestration layer.
//!
//! Two conditions deliberately do not appear here: a rejected response from
//! validation is a successful answer carrying refusal text, and degraded
//! retrieval is metadata on the answer. Both keep flowing through `Ok`.

use crate::llm::provider_types::{ProviderAttempt, ProviderKind};
use crate::types::CallerPrivilege;
use thiserror::Error;

pub type PanduResult<T> = Result<T, PanduError>;

/// Message shown to unprivileged users for any orchestration failure.
pub const PUBLIC_UNAVAILABLE_MESSAGE: &str =
    "Maaf, asisten AI sedang tidak dapat menjawab. Silakan coba beberapa saat lagi.";

#[derive(Debug, Clone, Error)]
pub enum PanduError {
    /// No API key is configured for an explicitly requested provider.
    #[error("no API key configured for {provider}")]
    CredentialMissing { provider: ProviderKind },

    /// The configured key fails the provider's documented format.
    #[error("API key for {provider} is malformed: expected {expected}")]
    CredentialMalformed {
        provider: ProviderKind,
        expected: String,
    },

    /// A retryable failure survived every retry attempt.
    #[error("{provider} failed transiently after {attempts} attempts: {message}")]
    TransientNetwork {
        provider: ProviderKind,
        message: String,
        attempts: u32,
    },

    /// The provider rejected the request in a way retries cannot fix.
    #[error("{provider} rejected the request: {message}")]
    PermanentProvider {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    /// Auto mode ran out of providers. The attempt list carries one audit
    /// line per provider: absent key, bad format, or the failure it hit.
    #[error("all providers exhausted: {}", format_attempts(.attempts))]
    AllProvidersExhausted { attempts: Vec<ProviderAttempt> },

    #[error("request cancelled")]
    Cancelled,

    /// The overall deadline passed before any provider answered.
    #[error("deadline exceeded: {}", format_attempts(.attempts))]
    DeadlineExceeded { attempts: Vec<ProviderAttempt> },

    #[error("invalid conversation: {message}")]
    InvalidConversation { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

fn format_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no providers attempted".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PanduError {
    pub fn config(message: impl Into<String>) -> Self {
        PanduError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_conversation(message: impl Into<String>) -> Self {
        PanduError::InvalidConversation {
            message: message.into(),
        }
    }

    /// True when retrying the same request later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PanduError::TransientNetwork { .. }
                | PanduError::AllProvidersExhausted { .. }
                | PanduError::DeadlineExceeded { .. }
        )
    }

    /// Render the message shown to the end user for this failure.
    ///
    /// Admins get actionable diagnostics; everyone else gets a generic
    /// unavailability sentence with no key names or provider internals.
    pub fn user_message(&self, privilege: CallerPrivilege) -> String {
        if privilege.is_admin() {
            self.admin_message()
        } else {
            PUBLIC_UNAVAILABLE_MESSAGE.to_string()
        }
    }

    fn admin_message(&self) -> String {
        match self {
            PanduError::CredentialMissing { provider } => format!(
                "No API key is configured for {}. Set `{}` in the site settings.",
                provider.display_name(),
                provider.settings_key_api()
            ),
            PanduError::CredentialMalformed { provider, expected } => format!(
                "The API key configured for {} is malformed: expected {}.",
                provider.display_name(),
                expected
            ),
            PanduError::TransientNetwork {
                provider,
                message,
                attempts,
            } => format!(
                "{} kept failing after {} attempts: {}. This is usually temporary; try again shortly.",
                provider.display_name(),
                attempts,
                message
            ),
            PanduError::PermanentProvider {
                provider, message, ..
            } => format!(
                "{} rejected the request: {}. Check the configured key and model.",
                provider.display_name(),
                message
            ),
            PanduError::AllProvidersExhausted { attempts } => {
                let mut lines = vec!["All AI providers failed:".to_string()];
                lines.extend(attempts.iter().map(|a| format!("  - {a}")));
                lines.push("Configure or fix one of: Groq, Gemini, OpenRouter.".to_string());
                lines.join("\n")
            }
            PanduError::Cancelled => "The request was cancelled.".to_string(),
            PanduError::DeadlineExceeded { attempts } => {
                let mut lines =
                    vec!["The deadline passed before any provider answered:".to_string()];
                lines.extend(attempts.iter().map(|a| format!("  - {a}")));
                lines.join("\n")
            }
            PanduError::InvalidConversation { message } => {
                format!("Invalid conversation: {message}.")
            }
            PanduError::Config { message } => format!("Configuration error: {message}."),
        }
    }
}
