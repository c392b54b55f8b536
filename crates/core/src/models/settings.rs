use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;

/// Environment variable holding the backend base URL.
pub const ENV_API_URL: &str = "PAPERTRADE_API_URL";
/// Environment variable overriding the chart history size.
pub const ENV_HISTORY_LIMIT: &str = "PAPERTRADE_HISTORY_LIMIT";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `http://localhost:8080/api`
    pub api_url: String,

    /// How many historical quotes seed a chart
    pub history_limit: usize,

    /// Seconds before a loaded history is fetched again
    pub history_stale_secs: u64,

    /// Seconds a hydrated quote counts as fresh
    pub quote_stale_secs: u64,

    /// Per-request timeout in seconds (not applied to the push channel)
    pub request_timeout_secs: u64,

    /// Push-channel reconnection schedule
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            history_limit: 100,
            history_stale_secs: 5 * 60,
            quote_stale_secs: 30,
            request_timeout_secs: 30,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Build from `PAPERTRADE_API_URL` (required) and
    /// `PAPERTRADE_HISTORY_LIMIT` (optional).
    pub fn from_env() -> Result<Self, CoreError> {
        let api_url = std::env::var(ENV_API_URL)
            .map_err(|_| CoreError::Config(format!("{ENV_API_URL} is not set")))?;
        let mut config = Self::new(api_url);
        if let Ok(raw) = std::env::var(ENV_HISTORY_LIMIT) {
            config.history_limit = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!("{ENV_HISTORY_LIMIT} must be a number, got {raw:?}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CoreError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.history_limit == 0 {
            return Err(CoreError::Config("history_limit must be > 0".into()));
        }
        self.reconnect.validate()
    }

    /// `api_url` without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn history_stale_after(&self) -> Duration {
        Duration::from_secs(self.history_stale_secs)
    }

    pub fn quote_stale_after(&self) -> Duration {
        Duration::from_secs(self.quote_stale_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Exponential backoff with jitter for the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,

    /// Fraction of the delay randomised in both directions (0.0..=1.0)
    pub jitter: f64,

    /// Give up after this many consecutive failures; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.multiplier < 1.0 || !self.multiplier.is_finite() {
            return Err(CoreError::Config("reconnect.multiplier must be >= 1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(CoreError::Config("reconnect.jitter must be within 0..=1".into()));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(CoreError::Config(
                "reconnect.max_delay_ms must be >= initial_delay_ms".into(),
            ));
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.map_or(true, |max| failures < max)
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(32) as i32);
        let ms = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(ms as u64)
    }

    /// Delay with jitter applied. `unit` is a random sample in `0.0..1.0`.
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_delay(attempt).as_millis() as f64;
        let spread = base * self.jitter;
        let ms = (base - spread + 2.0 * spread * unit.clamp(0.0, 1.0)).max(0.0);
        Duration::from_millis(ms as u64)
    }
}
