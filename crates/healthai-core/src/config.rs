//! Runtime configuration for the sync core.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
pub const DEFAULT_CACHE_PREFIX: &str = "health_ai_cache";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreConfig {
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub cache_prefix: String,
    pub alarm_tick_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            request_timeout_ms: 5_000,
            probe_timeout_ms: 1_200,
            cache_prefix: DEFAULT_CACHE_PREFIX.into(),
            alarm_tick_ms: 1_000,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            api_base: std::env::var("HEALTHAI_API_BASE").unwrap_or(defaults.api_base),
            request_timeout_ms: env_millis("HEALTHAI_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            probe_timeout_ms: env_millis("HEALTHAI_PROBE_TIMEOUT_MS")
                .unwrap_or(defaults.probe_timeout_ms),
            cache_prefix: std::env::var("HEALTHAI_CACHE_PREFIX")
                .unwrap_or(defaults.cache_prefix),
            alarm_tick_ms: env_millis("HEALTHAI_ALARM_TICK_MS").unwrap_or(defaults.alarm_tick_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// The alarm tick must beat the minute boundary or minutes get skipped.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.alarm_tick_ms == 0 || self.alarm_tick_ms >= 60_000 {
            anyhow::bail!(
                "alarm tick must be between 1ms and 59999ms, got {}ms",
                self.alarm_tick_ms
            );
        }
        if self.cache_prefix.is_empty() {
            anyhow::bail!("cache prefix must not be empty");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn alarm_tick(&self) -> Duration {
        Duration::from_millis(self.alarm_tick_ms)
    }
}

fn env_millis(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.probe_timeout() < config.request_timeout());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_slow_alarm_tick() {
        let config = CoreConfig {
            alarm_tick_ms: 60_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"api_base": "https://health.example/api"}"#).unwrap();
        assert_eq!(config.api_base, "https://health.example/api");
        assert_eq!(config.cache_prefix, DEFAULT_CACHE_PREFIX);
    }
}
