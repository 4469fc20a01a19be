//! Gemini adapter: the strongest general-purpose and multi-image provider.
//!
//! Gemini's `generateContent` dialect has no system role; leading system
//! text is folded into the first user turn. Images travel as `inline_data`
//! parts interleaved with caption text parts.

use crate::conversation::{Conversation, ImageAttachment, TurnRole};
use crate::llm::adapter::{
    empty_completion, error_for_status, error_for_transport, malformed_success,
    reference_image_caption, ModelTable, ProviderAdapter, ProviderRequest, QUERY_IMAGE_CAPTION,
};
use crate::llm::provider_types::{Completion, ProviderError, ProviderKind, TokenUsage};
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const KNOWN_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
];

const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemini-pro", "gemini-2.0-flash"),
    ("gemini-pro-vision", "gemini-2.0-flash"),
    ("gemini-1.5-flash", "gemini-2.0-flash"),
    ("gemini-1.5-pro", "gemini-2.5-pro"),
];

const MODEL_TABLE: ModelTable = ModelTable {
    default_model: DEFAULT_MODEL,
    known: KNOWN_MODELS,
    aliases: MODEL_ALIASES,
};

pub struct GeminiAdapter {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_base_url(http_client, ProviderKind::Gemini.default_base_url())
    }

    pub fn with_base_url(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

/// Convert a conversation to Gemini `contents`, folding system turns into
/// the first user turn.
fn build_contents(conversation: &Conversation) -> Vec<Value> {
    let system_text = conversation
        .turns
        .iter()
        .filter(|t| t.role == TurnRole::System)
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let mut system_pending = (!system_text.is_empty()).then_some(system_text);

    let mut contents = Vec::new();
    for turn in &conversation.turns {
        match turn.role {
            TurnRole::System => {}
            TurnRole::User => {
                let mut text = turn.content.clone();
                if let Some(system) = system_pending.take() {
                    text = format!("{system}\n\n{text}");
                }
                let mut parts = vec![json!({ "text": text })];
                push_image_parts(&mut parts, &turn.images);
                contents.push(json!({ "role": "user", "parts": parts }));
            }
            TurnRole::Assistant => {
                contents.push(json!({
                    "role": "model",
                    "parts": [{ "text": turn.content }]
                }));
            }
        }
    }
    contents
}

fn push_image_parts(parts: &mut Vec<Value>, images: &[ImageAttachment]) {
    for (i, image) in images.iter().enumerate() {
        let caption = if i == 0 {
            QUERY_IMAGE_CAPTION.to_string()
        } else {
            reference_image_caption(image.label.as_deref())
        };
        parts.push(json!({ "text": caption }));
        parts.push(json!({
            "inline_data": { "mime_type": image.mime_type, "data": image.data_base64 }
        }));
    }
}

fn parse_completion(payload: &Value, model: &str) -> Result<Completion, ProviderError> {
    let text = payload
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        // Covers safety blocks too: no candidates means no retry will help.
        return Err(empty_completion(ProviderKind::Gemini));
    }
    let usage = payload.get("usageMetadata").map(|u| TokenUsage {
        prompt_tokens: u
            .get("promptTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        completion_tokens: u
            .get("candidatesTokenCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    });
    Ok(Completion {
        text,
        model: model.to_string(),
        provider: ProviderKind::Gemini,
        usage,
    })
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        MODEL_TABLE.resolve(ProviderKind::Gemini, requested)
    }

    fn supports_multi_image(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &ProviderRequest<'_>,
    ) -> Result<Completion, ProviderError> {
        let kind = ProviderKind::Gemini;
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, request.model, request.api_key
        );
        let body = json!({
            "contents": build_contents(request.conversation),
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            }
        });

        let response = self
            .http_client
            .post(&url)
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
        parse_completion(&payload, &request.model)
    }
}
