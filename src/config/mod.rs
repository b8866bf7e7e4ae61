//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application
//! settings. Configuration is loaded from a TOML file with an environment
//! variable override for the webhook URL.
//!
//! # Example
//!
//! ```no_run
//! use profiteer::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

mod api;
mod governor;
mod logging;
mod scheduler;
mod upstream;
mod webhook;

pub use api::ApiConfig;
pub use governor::GovernorConfig;
pub use logging::LoggingConfig;
pub use scheduler::SchedulerConfig;
pub use upstream::UpstreamConfig;
pub use webhook::WebhookConfig;

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Aggregates all settings for the updater, the rate governor, and the query
/// API. Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream market API and catalog endpoints.
    pub upstream: UpstreamConfig,

    /// Outbound dispatch rate governing.
    pub governor: GovernorConfig,

    /// Full-cycle and rotating refresh scheduling.
    pub scheduler: SchedulerConfig,

    /// Read-only query API server.
    pub api: ApiConfig,

    /// Webhook notification delivery.
    pub webhook: WebhookConfig,

    /// Logging and tracing configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// The webhook URL is loaded from the `WEBHOOK_URL` environment variable
    /// (never from the config file, since it carries a secret token).
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.webhook.url = std::env::var("WEBHOOK_URL").ok();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.upstream.api_url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.upstream.server_list_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "server_list_url",
            }
            .into());
        }
        if self.upstream.chunk_size == 0 || self.upstream.chunk_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be between 1 and 100".to_string(),
            }
            .into());
        }

        let governor = &self.governor;
        if governor.target_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "target_rps",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if governor.safety_margin_rps >= governor.target_rps {
            return Err(ConfigError::InvalidValue {
                field: "safety_margin_rps",
                reason: "must be less than target_rps".to_string(),
            }
            .into());
        }
        if governor.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if governor.retry_budget == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_budget",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if governor.window_secs < 10 || governor.window_secs > 11 {
            return Err(ConfigError::InvalidValue {
                field: "window_secs",
                reason: "trailing horizon must be 10 or 11 seconds".to_string(),
            }
            .into());
        }
        if governor.timeout_ceiling_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ceiling_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let scheduler = &self.scheduler;
        if scheduler.full_cycle_enabled && scheduler.delay_between_runs_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delay_between_runs_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if scheduler.rotating_enabled && scheduler.rotating_total_period_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rotating_total_period_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if scheduler.stall_horizon_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stall_horizon_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.api.enabled && self.api.result_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "result_limit",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
