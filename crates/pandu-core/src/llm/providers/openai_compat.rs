//! Shared OpenAI-dialect request and response handling (Groq, OpenRouter).

use crate::conversation::{Conversation, TurnRole};
use crate::llm::adapter::{empty_completion, reference_image_caption, QUERY_IMAGE_CAPTION};
use crate::llm::provider_types::{Completion, ProviderError, ProviderKind, TokenUsage};
use serde_json::{json, Value};
use tracing::warn;

/// Build the `messages` array. `multi_image` controls whether reference
/// images ride along or get dropped with an in-prompt note.
pub(crate) fn build_messages(
    conversation: &Conversation,
    multi_image: bool,
    kind: ProviderKind,
) -> Vec<Value> {
    conversation
        .turns
        .iter()
        .map(|turn| {
            if turn.role == TurnRole::User && turn.has_images() {
                json!({ "role": "user", "content": image_content(turn, multi_image, kind) })
            } else {
                json!({ "role": turn.role.to_string(), "content": turn.content })
            }
        })
        .collect()
}

fn image_content(
    turn: &crate::conversation::ChatTurn,
    multi_image: bool,
    kind: ProviderKind,
) -> Vec<Value> {
    let mut text = turn.content.clone();
    let images: &[_] = if multi_image || turn.images.len() <= 1 {
        &turn.images
    } else {
        warn!(
            provider = %kind,
            dropped = turn.images.len() - 1,
            "provider accepts a single image; reference images dropped"
        );
        text.push_str("\n\n(Catatan: hanya foto utama yang dilampirkan.)");
        &turn.images[..1]
    };

    let mut parts = vec![json!({ "type": "text", "text": text })];
    for (i, image) in images.iter().enumerate() {
        let caption = if i == 0 {
            QUERY_IMAGE_CAPTION.to_string()
        } else {
            reference_image_caption(image.label.as_deref())
        };
        parts.push(json!({ "type": "text", "text": caption }));
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": image.to_data_url() }
        }));
    }
    parts
}

/// Extract the completion from a `chat/completions` response body.
pub(crate) fn parse_completion(
    payload: &Value,
    requested_model: &str,
    kind: ProviderKind,
) -> Result<Completion, ProviderError> {
    let text = payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if text.trim().is_empty() {
        return Err(empty_completion(kind));
    }
    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested_model)
        .to_string();
    let usage = payload.get("usage").map(|u| TokenUsage {
        prompt_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    });
    Ok(Completion {
        text: text.to_string(),
        model,
        provider: kind,
        usage,
    })
}
