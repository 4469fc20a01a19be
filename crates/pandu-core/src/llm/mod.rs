//! Provider adapters, retry policy, and the fallback router.

pub mod adapter;
pub mod provider_types;
pub mod providers;
pub mod retry;
pub mod router;

pub use adapter::{ProviderAdapter, ProviderRequest};
pub use provider_types::{
    AttemptOutcome, Completion, ErrorClass, ProviderAttempt, ProviderError, ProviderKind,
    TokenUsage,
};
pub use providers::{GeminiAdapter, GroqAdapter, OpenRouterAdapter};
pub use retry::{RetryConfig, RetryFailure, RetryPolicy};
pub use router::{
    ProviderPreference, ProviderRouter, RouteOptions, RouteSuccess, RoutingTable,
};
