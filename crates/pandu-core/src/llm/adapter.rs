//! The provider adapter seam and shared HTTP failure classification.

use crate::conversation::Conversation;
use crate::llm::provider_types::{Completion, ProviderError, ProviderKind};
use crate::llm::providers::sanitize_provider_error_text;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Caption placed before the query image in vision prompts.
pub(crate) const QUERY_IMAGE_CAPTION: &str = "FOTO YANG DITANYAKAN:";

/// Caption placed before each reference image in vision prompts.
pub(crate) fn reference_image_caption(label: Option<&str>) -> String {
    format!("--- CITRA REFERENSI: {} ---", label.unwrap_or("tanpa label"))
}

/// One normalized request handed to an adapter.
#[derive(Debug, Clone)]
pub struct ProviderRequest<'a> {
    pub conversation: &'a Conversation,
    pub api_key: &'a str,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A thin translation layer over one provider's HTTP dialect.
///
/// Adapters do exactly one request per call: no retries, no fallback, no
/// streaming. Repetition and provider choice live above this seam, which is
/// also where tests substitute scripted fakes.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Map a requested model id to a current one.
    ///
    /// `None` and unknown ids resolve to the adapter's default; retired ids
    /// map through the alias table.
    fn resolve_model(&self, requested: Option<&str>) -> String;

    /// Whether reference images can accompany the query image.
    fn supports_multi_image(&self) -> bool;

    async fn complete(&self, request: &ProviderRequest<'_>)
        -> Result<Completion, ProviderError>;
}

/// Static model table each adapter resolves against.
pub(crate) struct ModelTable {
    pub default_model: &'static str,
    pub known: &'static [&'static str],
    /// Retired id -> current id.
    pub aliases: &'static [(&'static str, &'static str)],
}

impl ModelTable {
    pub(crate) fn resolve(&self, kind: ProviderKind, requested: Option<&str>) -> String {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return self.default_model.to_string();
        };
        if self.known.contains(&requested) {
            return requested.to_string();
        }
        if let Some((_, current)) = self.aliases.iter().find(|(old, _)| *old == requested) {
            debug!(provider = %kind, from = requested, to = current, "mapped retired model id");
            return current.to_string();
        }
        warn!(
            provider = %kind,
            model = requested,
            fallback = self.default_model,
            "unknown model id, using the provider default"
        );
        self.default_model.to_string()
    }
}

/// Classify a non-success HTTP response: 429 and 5xx are worth retrying,
/// every other 4xx means the request itself is the problem.
pub(crate) fn error_for_status(kind: ProviderKind, status: u16, body: &str) -> ProviderError {
    let detail = sanitize_provider_error_text(body);
    let message = format!("{kind} returned HTTP {status}: {detail}");
    if status == 429 || (500..=599).contains(&status) {
        ProviderError::transient(message).with_status(status)
    } else {
        ProviderError::permanent(message).with_status(status)
    }
}

/// Classify a transport-level failure from `reqwest`.
pub(crate) fn error_for_transport(kind: ProviderKind, error: reqwest::Error) -> ProviderError {
    let detail = sanitize_provider_error_text(&error.to_string());
    if error.is_timeout() || error.is_connect() {
        ProviderError::transient(format!("{kind} request failed: {detail}"))
    } else {
        ProviderError::permanent(format!("{kind} request failed: {detail}"))
    }
}

/// A 2xx response whose body could not be decoded.
pub(crate) fn malformed_success(kind: ProviderKind, detail: impl std::fmt::Display) -> ProviderError {
    ProviderError::permanent(format!(
        "{kind} returned an unparseable success response: {detail}"
    ))
}

/// A 2xx response carrying no completion text.
pub(crate) fn empty_completion(kind: ProviderKind) -> ProviderError {
    ProviderError::permanent(format!("{kind} returned an empty completion"))
}
