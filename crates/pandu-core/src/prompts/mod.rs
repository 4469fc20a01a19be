//! Prompt composition for the assistant.

pub mod composer;

pub use composer::{CONTEXT_BEGIN, CONTEXT_END, PromptComposer, strip_context_block};
