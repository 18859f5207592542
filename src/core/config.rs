//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::errors::{AnalysisError, Result};

/// Default Gemini endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Model used when neither the CLI nor a settings file names one
pub const DEFAULT_MODEL: &str = "gemini-3-flash";

/// Friendly names mapped to the API model ids
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemini-3-pro", "gemini-3-pro-preview"),
    ("gemini-3-flash", "gemini-3-flash-preview"),
];

/// Configuration for the video agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Google API key
    pub api_key: String,
    /// Service endpoint, without a trailing path
    pub api_base: String,
    /// API model id, aliases already resolved
    pub model_id: String,
    /// Sleep between status fetches
    pub poll_interval_ms: u64,
    /// `None` waits for as long as the service keeps reporting PROCESSING
    pub max_poll_attempts: Option<u32>,
    /// Per-request HTTP timeout
    pub timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
            api_base: DEFAULT_API_BASE.to_string(),
            model_id: resolve_model_alias(DEFAULT_MODEL),
            poll_interval_ms: 2000,
            max_poll_attempts: Some(900),
            timeout_ms: 600_000,
        }
    }
}

/// Map a friendly model name to its API id, passing unknown names through
pub fn resolve_model_alias(model: &str) -> String {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == model)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| model.to_string())
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| AnalysisError::ConfigError {
            message: format!("{} has an invalid value: {}", key, raw),
        }),
        Err(_) => Ok(default),
    }
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| AnalysisError::ConfigError {
            message: "GOOGLE_API_KEY not found in environment or passed as argument".to_string(),
        })?;

        let api_base =
            std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let poll_interval_ms = env_or("POLL_INTERVAL_MS", 2000_u64)?;

        let max_poll_attempts = match env_or("MAX_POLL_ATTEMPTS", 900_u32)? {
            0 => None,
            n => Some(n),
        };

        let timeout_ms = env_or("REQUEST_TIMEOUT_MS", 600_000_u64)?;

        let config = Self {
            api_key,
            api_base,
            model_id: resolve_model_alias(&model),
            poll_interval_ms,
            max_poll_attempts,
            timeout_ms,
        };
        debug!(
            "Loaded config: model={}, poll_interval={}ms, max_poll_attempts={:?}",
            config.model_id, config.poll_interval_ms, config.max_poll_attempts
        );

        Ok(config)
    }

    /// Override the model, resolving friendly aliases
    pub fn with_model(mut self, model: &str) -> Self {
        self.model_id = resolve_model_alias(model);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(AnalysisError::ConfigError {
                message: "API key is required".to_string(),
            });
        }

        if self.api_base.is_empty() {
            return Err(AnalysisError::ConfigError {
                message: "API endpoint is required".to_string(),
            });
        }

        if self.model_id.is_empty() {
            return Err(AnalysisError::ConfigError {
                message: "model id is required".to_string(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(AnalysisError::ConfigError {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.max_poll_attempts.is_none() {
            warn!("Polling is unbounded; a file stuck in PROCESSING will block forever");
        }

        Ok(())
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
