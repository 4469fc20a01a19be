//! Pandu Core Library
//!
//! This crate provides the AI orchestration layer for the Pandu OSIS
//! assistant: provider adapters with retry and fallback routing, knowledge
//! retrieval and context rendering, prompt composition, and response
//! validation with privilege-aware redaction.

pub mod assistant;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod prompts;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use assistant::{Answer, AnswerOptions, Assistant, AssistantBuilder};
pub use config::OrchestratorConfig;
pub use conversation::{ChatTurn, Conversation, ImageAttachment, TurnRole};
pub use credentials::{
    CredentialStatus, CredentialStore, StaticCredentialStore, provider_status,
};
pub use error::{PUBLIC_UNAVAILABLE_MESSAGE, PanduError, PanduResult};
pub use knowledge::{
    InMemoryKnowledgeSource, KnowledgeRecord, KnowledgeSource, RecordCategory, RetrievalMode,
};
pub use llm::{
    Completion, ProviderAdapter, ProviderAttempt, ProviderKind, ProviderPreference, RetryConfig,
    RoutingTable,
};
pub use prompts::PromptComposer;
pub use types::{CallerPrivilege, QueryClass};
pub use validation::{REFUSAL_UNKNOWN_PERSON, ResponseValidator, ValidationReport};
