//! Response validation: fact-checking, redaction, normalization.

pub mod redaction;
pub mod validator;

pub use redaction::{PRIVACY_NOTICE, normalize_formatting, redact_sensitive};
pub use validator::{
    ContextFacts, PersonFact, REFUSAL_UNKNOWN_PERSON, ResponseValidator, ValidationReport,
    ValidationVerdict,
};
