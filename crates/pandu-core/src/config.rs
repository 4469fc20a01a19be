//! Orchestrator configuration.
//!
//! Everything here deserializes from JSON so site operators can tune the
//! assistant without a redeploy. Durations accept humantime strings
//! (`"30s"`, `"2m"`).

use crate::error::{PanduError, PanduResult};
use crate::llm::retry::RetryConfig;
use crate::llm::router::RoutingTable;
use serde::Deserialize;
use std::time::Duration;

/// Tunables for the whole orchestration layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Per-provider retry behavior.
    pub retry: RetryConfig,
    /// Provider priority per query class.
    pub routing: RoutingTable,
    /// How long a retrieved knowledge context stays valid.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Max records per category when falling back to a full snapshot.
    pub snapshot_limit: usize,
    /// Completion token cap sent to every provider.
    pub max_tokens: u32,
    /// Sampling temperature sent to every provider.
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            routing: RoutingTable::default(),
            cache_ttl: Duration::from_secs(120),
            snapshot_limit: 25,
            max_tokens: 1024,
            temperature: 0.4,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> PanduResult<()> {
        self.retry.validate()?;
        self.routing.validate()?;
        if self.snapshot_limit == 0 {
            return Err(PanduError::config("snapshot_limit must be greater than 0"));
        }
        if self.max_tokens == 0 {
            return Err(PanduError::config("max_tokens must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PanduError::config(
                "temperature must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider_types::ProviderKind;

    #[test]
    fn default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.routing.generic[0], ProviderKind::Gemini);
        assert_eq!(config.routing.identification[0], ProviderKind::Groq);
    }

    #[test]
    fn deserializes_partial_json_with_humantime_durations() {
        let config: OrchestratorConfig = serde_json::from_str(
            r#"{
                "cache_ttl": "5m",
                "retry": { "max_attempts": 2, "base_delay": "500ms" },
                "routing": { "generic": ["groq"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        // Unspecified retry fields keep their defaults.
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(30));
        assert_eq!(config.routing.generic, vec![ProviderKind::Groq]);
        // Unspecified routing lists keep their defaults too.
        assert_eq!(config.routing.identification.len(), 3);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<OrchestratorConfig, _> =
            serde_json::from_str(r#"{ "cache_ttl_seconds": 120 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let config = OrchestratorConfig {
            temperature: 3.0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            max_tokens: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            snapshot_limit: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
