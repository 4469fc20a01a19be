//! OpenRouter adapter: the last-resort meta-provider.
//!
//! Same OpenAI dialect as Groq, plus the attribution headers OpenRouter asks
//! integrators to send. Multi-image requests are supported.

use super::openai_compat;
use crate::llm::adapter::{
    error_for_status, error_for_transport, malformed_success, ModelTable, ProviderAdapter,
    ProviderRequest,
};
use crate::llm::provider_types::{Completion, ProviderError, ProviderKind};
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";

const KNOWN_MODELS: &[&str] = &[
    "meta-llama/llama-3.3-70b-instruct:free",
    "google/gemini-2.0-flash-exp:free",
    "openai/gpt-4o-mini",
    "anthropic/claude-3.5-haiku",
];

const MODEL_ALIASES: &[(&str, &str)] = &[
    ("meta-llama/llama-3-70b-instruct", "meta-llama/llama-3.3-70b-instruct:free"),
    ("google/gemini-flash-1.5", "google/gemini-2.0-flash-exp:free"),
];

const MODEL_TABLE: ModelTable = ModelTable {
    default_model: DEFAULT_MODEL,
    known: KNOWN_MODELS,
    aliases: MODEL_ALIASES,
};

const SITE_URL: &str = "https://osis.smkn1.sch.id";
const SITE_TITLE: &str = "Pandu OSIS Assistant";

pub struct OpenRouterAdapter {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenRouterAdapter {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_base_url(http_client, ProviderKind::OpenRouter.default_base_url())
    }

    pub fn with_base_url(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        MODEL_TABLE.resolve(ProviderKind::OpenRouter, requested)
    }

    fn supports_multi_image(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &ProviderRequest<'_>,
    ) -> Result<Completion, ProviderError> {
        let kind = ProviderKind::OpenRouter;
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": request.model,
            "messages": openai_compat::build_messages(request.conversation, true, kind),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(request.api_key)
            .header("HTTP-Referer", SITE_URL)
            .header("X-Title", SITE_TITLE)
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
