//! Shared vocabulary used across the orchestration pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege level of the caller a question is answered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerPrivilege {
    /// Ordinary member or anonymous traffic. Sensitive details are redacted
    /// and failures render as a generic unavailability message.
    #[default]
    Public,
    /// Site administrators. Failures render actionable diagnostics and
    /// responses skip redaction.
    Admin,
}

impl CallerPrivilege {
    pub fn is_admin(&self) -> bool {
        matches!(self, CallerPrivilege::Admin)
    }
}

impl fmt::Display for CallerPrivilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerPrivilege::Public => write!(f, "public"),
            CallerPrivilege::Admin => write!(f, "admin"),
        }
    }
}

/// Coarse classification of what the user is asking for.
///
/// Identification questions ("who is this?") use a different provider order
/// and get stricter response validation than generic questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryClass {
    #[default]
    Generic,
    Identification,
}

/// Phrases that mark a question as asking to identify a person.
const IDENTIFICATION_HINTS: &[&str] = &[
    "siapa",
    "siapakah",
    "kenalin",
    "kenalkan",
    "identifikasi",
    "sekbid berapa",
    "anggota mana",
    "foto siapa",
    "gambar siapa",
    "who is",
    "whose",
];

impl QueryClass {
    /// Classify a user question by keyword lookup.
    pub fn classify(text: &str) -> Self {
        let lowered = text.to_lowercase();
        if IDENTIFICATION_HINTS.iter().any(|hint| lowered.contains(hint)) {
            QueryClass::Identification
        } else {
            QueryClass::Generic
        }
    }
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryClass::Generic => write!(f, "generic"),
            QueryClass::Identification => write!(f, "identification"),
        }
    }
}
