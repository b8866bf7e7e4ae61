//! Webhook notification configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the outbound webhook notifier.
///
/// The URL carries a secret token and is therefore taken from the
/// `WEBHOOK_URL` environment variable, never from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Enable webhook notifications.
    pub enabled: bool,
    /// Delivery endpoint; populated from `WEBHOOK_URL` at load time.
    #[serde(skip)]
    pub url: Option<String>,
    /// Display name attached to every message.
    pub username: String,
    /// Collapse bursts of error events to one delivery per window.
    pub error_throttle_secs: u64,
    /// Optional mention string prepended to stall alerts (e.g. a user id).
    pub mention: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            username: "Profiteer Updater".to_string(),
            error_throttle_secs: 60,
            mention: None,
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub fn error_throttle(&self) -> Duration {
        Duration::from_secs(self.error_throttle_secs)
    }
}
