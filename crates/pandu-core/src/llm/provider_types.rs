//! Provider identities and the wire-level result/error vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upstream LLM providers the router can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Groq,
        ProviderKind::Gemini,
        ProviderKind::OpenRouter,
    ];

    /// Short machine name used in settings keys and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    /// Human-readable description of the documented API-key shape.
    pub fn key_format(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "a key starting with \"gsk_\"",
            ProviderKind::Gemini => "a key starting with \"AIza\"",
            ProviderKind::OpenRouter => "a key starting with \"sk-or-\"",
        }
    }

    /// Whether a configured key matches the provider's documented format.
    pub fn key_matches(&self, key: &str) -> bool {
        let key = key.trim();
        let prefix = match self {
            ProviderKind::Groq => "gsk_",
            ProviderKind::Gemini => "AIza",
            ProviderKind::OpenRouter => "sk-or-",
        };
        key.starts_with(prefix) && key.len() >= 20
    }

    /// Settings key holding this provider's API key.
    pub fn settings_key_api(&self) -> String {
        format!("{}_api_key", self.name())
    }

    /// Settings key holding this provider's model override.
    pub fn settings_key_model(&self) -> String {
        format!("{}_model", self.name())
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openrouter" | "open-router" => Ok(ProviderKind::OpenRouter),
            other => Err(format!(
                "unknown provider '{other}' (expected groq, gemini, or openrouter)"
            )),
        }
    }
}

/// Token accounting reported by a provider, when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A successful completion returned by an adapter.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub provider: ProviderKind,
    pub usage: Option<TokenUsage>,
}

/// How a provider failure should be treated by the retry and routing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: rate limits, 5xx, timeouts, connection failures.
    Transient,
    /// Retrying the same request cannot help: auth rejects, other 4xx,
    /// unparseable success bodies, empty completions.
    Permanent,
    /// The caller gave up; stop everything.
    Cancelled,
}

/// Failure reported by a single adapter call.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub class: ErrorClass,
    pub message: String,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
            status: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Permanent,
            message: message.into(),
            status: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            class: ErrorClass::Cancelled,
            message: "request cancelled".to_string(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.class == ErrorClass::Transient
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Audit record of one provider's participation in a routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub outcome: AttemptOutcome,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    TransientExhausted { attempts: u32 },
    PermanentError,
    SkippedMissingCredential,
    SkippedMalformedCredential,
    SkippedDeadline,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} [{}]", self.provider, model)?,
            None => write!(f, "{}", self.provider)?,
        }
        match &self.outcome {
            AttemptOutcome::Success => write!(f, ": success"),
            AttemptOutcome::TransientExhausted { attempts } => {
                write!(f, ": transient failure after {attempts} attempts ({})", self.detail)
            }
            AttemptOutcome::PermanentError => {
                write!(f, ": permanent failure ({})", self.detail)
            }
            AttemptOutcome::SkippedMissingCredential => {
                write!(f, ": skipped, no API key configured")
            }
            AttemptOutcome::SkippedMalformedCredential => {
                write!(f, ": skipped, API key malformed ({})", self.detail)
            }
            AttemptOutcome::SkippedDeadline => write!(f, ": skipped, deadline exceeded"),
        }
    }
}
