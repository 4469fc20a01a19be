//! Table-driven provider routing with fallback, deadlines, and audit records.
//!
//! The router walks an ordered provider list for the query class, skipping
//! candidates whose credentials are absent or malformed, retrying transient
//! failures per provider, and stopping at the first success. Every provider
//! it touches leaves a [`ProviderAttempt`] so exhaustion errors can name each
//! reason.

use crate::config::OrchestratorConfig;
use crate::conversation::Conversation;
use crate::credentials::{self, CredentialFault, CredentialStore, ProviderCredential};
use crate::error::{PanduError, PanduResult};
use crate::llm::adapter::{ProviderAdapter, ProviderRequest};
use crate::llm::provider_types::{
    AttemptOutcome, Completion, ErrorClass, ProviderAttempt, ProviderKind,
};
use crate::llm::retry::{RetryFailure, RetryPolicy};
use crate::types::QueryClass;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Caller's provider choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderPreference {
    /// Walk the routing table for the query class.
    #[default]
    Auto,
    /// Use exactly this provider; never fall back to another.
    Explicit(ProviderKind),
}

/// Priority order per query class. Data, not code: reordering providers is
/// a configuration change, not an edit to the router.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingTable {
    pub generic: Vec<ProviderKind>,
    pub identification: Vec<ProviderKind>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            // Strongest general model first.
            generic: vec![
                ProviderKind::Gemini,
                ProviderKind::Groq,
                ProviderKind::OpenRouter,
            ],
            // Empirically most accurate at member identification first; the
            // meta-provider is promoted above Gemini for this class only.
            identification: vec![
                ProviderKind::Groq,
                ProviderKind::OpenRouter,
                ProviderKind::Gemini,
            ],
        }
    }
}

impl RoutingTable {
    pub fn order_for(&self, class: QueryClass) -> &[ProviderKind] {
        match class {
            QueryClass::Generic => &self.generic,
            QueryClass::Identification => &self.identification,
        }
    }

    pub fn validate(&self) -> PanduResult<()> {
        if self.generic.is_empty() || self.identification.is_empty() {
            return Err(PanduError::config(
                "routing table must name at least one provider per query class",
            ));
        }
        Ok(())
    }
}

/// Options scoped to one routed request.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub preference: ProviderPreference,
    pub class: QueryClass,
    /// Overall wall-clock budget across all providers and retries.
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

/// A routed completion plus the audit trail of every provider touched.
#[derive(Debug, Clone)]
pub struct RouteSuccess {
    pub completion: Completion,
    pub attempts: Vec<ProviderAttempt>,
}

/// Routes requests across providers in table order.
pub struct ProviderRouter {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    credentials: Arc<dyn CredentialStore>,
    table: RoutingTable,
    retry: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
}

impl ProviderRouter {
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        credentials: Arc<dyn CredentialStore>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            adapters,
            credentials,
            table: config.routing.clone(),
            retry: RetryPolicy::new(config.retry.clone()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn adapter_for(&self, kind: ProviderKind) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.iter().find(|a| a.kind() == kind)
    }

    /// Route one composed conversation to a provider.
    #[tracing::instrument(skip_all, fields(preference = ?opts.preference, class = %opts.class))]
    pub async fn route(
        &self,
        conversation: &Conversation,
        opts: &RouteOptions,
    ) -> PanduResult<RouteSuccess> {
        let deadline = opts.deadline.map(|budget| Instant::now() + budget);
        match opts.preference {
            ProviderPreference::Explicit(kind) => {
                self.route_explicit(conversation, kind, deadline, &opts.cancel).await
            }
            ProviderPreference::Auto => {
                self.route_auto(conversation, opts.class, deadline, &opts.cancel).await
            }
        }
    }

    /// Honor an explicit provider choice or fail clearly. No silent fallback:
    /// a missing or malformed key for the requested provider is the answer.
    async fn route_explicit(
        &self,
        conversation: &Conversation,
        kind: ProviderKind,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> PanduResult<RouteSuccess> {
        let credential = match credentials::resolve(self.credentials.as_ref(), kind) {
            Ok(credential) => credential,
            Err(CredentialFault::Missing) => {
                return Err(PanduError::CredentialMissing { provider: kind });
            }
            Err(CredentialFault::Malformed { expected }) => {
                return Err(PanduError::CredentialMalformed {
                    provider: kind,
                    expected,
                });
            }
        };
        let adapter = self
            .adapter_for(kind)
            .ok_or_else(|| PanduError::config(format!("no adapter registered for {kind}")))?
            .clone();

        if deadline_expired(deadline) {
            return Err(PanduError::DeadlineExceeded {
                attempts: vec![skip_attempt(kind, AttemptOutcome::SkippedDeadline)],
            });
        }

        let (result, model) = self
            .call_provider(adapter.as_ref(), &credential, conversation, deadline, cancel)
            .await;
        match result {
            Ok(completion) => {
                info!(provider = %kind, model = %model, "provider answered");
                Ok(RouteSuccess {
                    attempts: vec![ProviderAttempt {
                        provider: kind,
                        model: Some(model),
                        outcome: AttemptOutcome::Success,
                        detail: String::new(),
                    }],
                    completion,
                })
            }
            Err(failure) if failure.deadline_hit => {
                warn!(provider = %kind, "deadline exceeded during provider retries");
                Err(PanduError::DeadlineExceeded {
                    attempts: vec![ProviderAttempt {
                        provider: kind,
                        model: Some(model),
                        outcome: AttemptOutcome::TransientExhausted {
                            attempts: failure.attempts,
                        },
                        detail: failure.error.to_string(),
                    }],
                })
            }
            Err(failure) => Err(taxonomy_error(kind, failure)),
        }
    }

    async fn route_auto(
        &self,
        conversation: &Conversation,
        class: QueryClass,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> PanduResult<RouteSuccess> {
        let order = self.table.order_for(class);
        let mut attempts: Vec<ProviderAttempt> = Vec::new();
        let mut deadline_hit = false;

        for &kind in order {
            if cancel.is_cancelled() {
                return Err(PanduError::Cancelled);
            }

            if deadline_expired(deadline) {
                warn!(provider = %kind, "deadline exceeded before provider was tried");
                attempts.push(skip_attempt(kind, AttemptOutcome::SkippedDeadline));
                continue;
            }

            let credential = match credentials::resolve(self.credentials.as_ref(), kind) {
                Ok(credential) => credential,
                Err(CredentialFault::Missing) => {
                    debug!(provider = %kind, "skipping provider with no configured key");
                    attempts.push(skip_attempt(kind, AttemptOutcome::SkippedMissingCredential));
                    continue;
                }
                Err(CredentialFault::Malformed { expected }) => {
                    warn!(provider = %kind, "skipping provider with malformed key");
                    attempts.push(ProviderAttempt {
                        provider: kind,
                        model: None,
                        outcome: AttemptOutcome::SkippedMalformedCredential,
                        detail: format!("expected {expected}"),
                    });
                    continue;
                }
            };

            let Some(adapter) = self.adapter_for(kind).cloned() else {
                attempts.push(ProviderAttempt {
                    provider: kind,
                    model: None,
                    outcome: AttemptOutcome::PermanentError,
                    detail: "no adapter registered".to_string(),
                });
                continue;
            };

            let (result, model) = self
                .call_provider(adapter.as_ref(), &credential, conversation, deadline, cancel)
                .await;
            match result {
                Ok(completion) => {
                    if attempts.is_empty() {
                        info!(provider = %kind, model = %model, "provider answered");
                    } else {
                        info!(
                            provider = %kind,
                            model = %model,
                            earlier_candidates = attempts.len(),
                            "fell back to provider"
                        );
                    }
                    attempts.push(ProviderAttempt {
                        provider: kind,
                        model: Some(model),
                        outcome: AttemptOutcome::Success,
                        detail: String::new(),
                    });
                    return Ok(RouteSuccess {
                        completion,
                        attempts,
                    });
                }
                Err(failure) => {
                    if failure.error.class == ErrorClass::Cancelled {
                        return Err(PanduError::Cancelled);
                    }
                    if failure.deadline_hit {
                        deadline_hit = true;
                    }
                    warn!(provider = %kind, error = %failure.error, "provider failed; trying the next one");
                    let outcome = match failure.error.class {
                        ErrorClass::Transient => AttemptOutcome::TransientExhausted {
                            attempts: failure.attempts,
                        },
                        _ => AttemptOutcome::PermanentError,
                    };
                    attempts.push(ProviderAttempt {
                        provider: kind,
                        model: Some(model),
                        outcome,
                        detail: failure.error.to_string(),
                    });
                }
            }
        }

        if deadline_hit
            || attempts
                .iter()
                .any(|a| a.outcome == AttemptOutcome::SkippedDeadline)
        {
            return Err(PanduError::DeadlineExceeded { attempts });
        }
        Err(PanduError::AllProvidersExhausted { attempts })
    }

    async fn call_provider(
        &self,
        adapter: &dyn ProviderAdapter,
        credential: &ProviderCredential,
        conversation: &Conversation,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> (Result<Completion, RetryFailure>, String) {
        let kind = adapter.kind();
        let model = adapter.resolve_model(credential.model.as_deref());
        let request = ProviderRequest {
            conversation,
            api_key: &credential.api_key,
            model: model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let result = self
            .retry
            .run(kind, deadline, cancel, |_attempt| {
                adapter.complete(&request)
            })
            .await;
        (result, model)
    }
}

fn deadline_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn skip_attempt(kind: ProviderKind, outcome: AttemptOutcome) -> ProviderAttempt {
    ProviderAttempt {
        provider: kind,
        model: None,
        outcome,
        detail: String::new(),
    }
}

fn taxonomy_error(kind: ProviderKind, failure: RetryFailure) -> PanduError {
    match failure.error.class {
        ErrorClass::Cancelled => PanduError::Cancelled,
        ErrorClass::Transient => PanduError::TransientNetwork {
            provider: kind,
            message: failure.error.to_string(),
            attempts: failure.attempts,
        },
        ErrorClass::Permanent => PanduError::PermanentProvider {
            provider: kind,
            status: failure.error.status,
            message: failure.error.message,
        },
    }
}
