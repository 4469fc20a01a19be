//! Groq adapter: the fast, cheap first stop for identification questions.
//!
//! Groq speaks the OpenAI `chat/completions` dialect. Its vision-capable
//! models take a single image per request, so reference images are dropped
//! before the wire.

use super::openai_compat;
use crate::llm::adapter::{
    error_for_status, error_for_transport, malformed_success, ModelTable, ProviderAdapter,
    ProviderRequest,
};
use crate::llm::provider_types::{Completion, ProviderError, ProviderKind};
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

const KNOWN_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "meta-llama/llama-4-scout-17b-16e-instruct",
    "qwen/qwen3-32b",
];

const MODEL_ALIASES: &[(&str, &str)] = &[
    ("llama3-70b-8192", "llama-3.3-70b-versatile"),
    ("llama3-8b-8192", "llama-3.1-8b-instant"),
    ("mixtral-8x7b-32768", "llama-3.3-70b-versatile"),
    ("llama-3.2-90b-vision-preview", "meta-llama/llama-4-scout-17b-16e-instruct"),
];

const MODEL_TABLE: ModelTable = ModelTable {
    default_model: DEFAULT_MODEL,
    known: KNOWN_MODELS,
    aliases: MODEL_ALIASES,
};

pub struct GroqAdapter {
    http_client: reqwest::Client,
    base_url: String,
}

impl GroqAdapter {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_base_url(http_client, ProviderKind::Groq.default_base_url())
    }

    pub fn with_base_url(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GroqAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        MODEL_TABLE.resolve(ProviderKind::Groq, requested)
    }

    fn supports_multi_image(&self) -> bool {
        false
    }

    async fn complete(
        &self,
        request: &ProviderRequest<'_>,
    ) -> Result<Completion, ProviderError> {
        let kind = ProviderKind::Groq;
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": request.model,
            "messages": openai_compat::build_messages(request.conversation, false, kind),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| error_for_transport(kind, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(error_for_status(kind, status.as_u16(), &body_text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| malformed_success(kind, e))?;
        openai_compat::parse_completion(&payload, &request.model, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_used_when_nothing_is_requested() {
        let adapter = GroqAdapter::new(reqwest::Client::new());
        assert_eq!(adapter.resolve_model(None), DEFAULT_MODEL);
    }

    #[test]
    fn retired_ids_map_to_current_ones() {
        let adapter = GroqAdapter::new(reqwest::Client::new());
        assert_eq!(
            adapter.resolve_model(Some("llama3-8b-8192")),
            "llama-3.1-8b-instant"
        );
        assert_eq!(adapter.resolve_model(Some("made-up-model")), DEFAULT_MODEL);
    }

    #[test]
    fn groq_takes_one_image_per_request() {
        let adapter = GroqAdapter::new(reqwest::Client::new());
        assert!(!adapter.supports_multi_image());
    }
}
