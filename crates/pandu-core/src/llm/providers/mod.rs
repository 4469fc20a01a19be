//! Concrete provider adapters.

mod error_utils;
mod gemini;
mod groq;
mod openai_compat;
mod openrouter;

pub use gemini::GeminiAdapter;
pub use groq::GroqAdapter;
pub use openrouter::OpenRouterAdapter;

pub(crate) use error_utils::sanitize_provider_error_text;
