//! Discord-compatible webhook notifier.
//!
//! Delivery runs on a spawned worker fed by an unbounded channel so the
//! update path never waits on the network. Delivery failures are logged and
//! swallowed.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::config::WebhookConfig;
use crate::error::{ConfigError, Error, Result};
use crate::port::notifier::{Event, Notifier};

const COLOR_STARTED: u32 = 5_832_650;
const COLOR_CYCLE: u32 = 5_814_783;
const COLOR_SUCCESS: u32 = 4_169_782;
const COLOR_WARN: u32 = 16_734_296;
const COLOR_ERROR: u32 = 16_711_680;

/// Sends lifecycle and failure events to a webhook endpoint.
pub struct WebhookNotifier {
    tx: mpsc::UnboundedSender<Event>,
}

impl WebhookNotifier {
    /// Create the notifier and spawn its delivery worker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no webhook URL is
    /// configured.
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let url = config.url.clone().ok_or(Error::Config(ConfigError::MissingField {
            field: "webhook.url (WEBHOOK_URL)",
        }))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            client: Client::new(),
            url,
            config,
            last_error_sent: None,
        };
        tokio::spawn(worker.run(rx));

        Ok(Self { tx })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: Event) {
        // Send fails only after shutdown, when delivery no longer matters.
        let _ = self.tx.send(event);
    }
}

struct Worker {
    client: Client,
    url: String,
    config: WebhookConfig,
    last_error_sent: Option<Instant>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            if event.is_error() && !self.error_window_open() {
                debug!("Suppressing error notification inside throttle window");
                continue;
            }
            if event.is_error() {
                self.last_error_sent = Some(Instant::now());
            }

            let payload = self.render(&event);
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    error!(status = %response.status(), "Webhook delivery rejected");
                }
                Err(err) => {
                    error!(error = %err, "Webhook delivery failed");
                }
            }
        }
    }

    fn error_window_open(&self) -> bool {
        match self.last_error_sent {
            Some(at) => at.elapsed() >= self.config.error_throttle(),
            None => true,
        }
    }

    fn render(&self, event: &Event) -> Value {
        let (content, embed) = match event {
            Event::UpdaterStarted => (
                None,
                json!({
                    "title": "Updater started",
                    "description": "Fetching catalog and server list",
                    "color": COLOR_STARTED,
                }),
            ),
            Event::CycleStarted {
                servers,
                items,
                chunks,
                requests,
                expected,
            } => (
                None,
                json!({
                    "title": "Update cycle started",
                    "color": COLOR_CYCLE,
                    "fields": [
                        { "name": "Servers", "value": servers.to_string(), "inline": true },
                        { "name": "Items", "value": items.to_string(), "inline": true },
                        { "name": "Chunks per server", "value": chunks.to_string(), "inline": true },
                        { "name": "Total requests", "value": requests.to_string(), "inline": true },
                        { "name": "Expected duration", "value": format_duration(*expected), "inline": true },
                    ],
                }),
            ),
            Event::CycleCompleted(report) => {
                let (title, color) = if report.overall_success() {
                    ("Update cycle completed", COLOR_SUCCESS)
                } else {
                    ("Update cycle completed with failures", COLOR_WARN)
                };
                let failed = report
                    .failed_servers()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut fields = vec![
                    json!({ "name": "Servers", "value": report.server_count().to_string(), "inline": true }),
                    json!({ "name": "Elapsed", "value": format_duration(report.total_elapsed()), "inline": true }),
                    json!({ "name": "Average per server", "value": format_duration(report.average_per_server()), "inline": true }),
                ];
                if !failed.is_empty() {
                    fields.push(json!({ "name": "Failed", "value": failed, "inline": false }));
                }
                (
                    None,
                    json!({ "title": title, "color": color, "fields": fields }),
                )
            }
            Event::UpstreamError { source, message } => (
                None,
                json!({
                    "title": source,
                    "description": message,
                    "color": COLOR_ERROR,
                }),
            ),
            Event::StallDetected { horizon } => (
                self.config.mention.clone(),
                json!({
                    "title": "Updater stalled",
                    "description": format!(
                        "No successful update cycle in the last {}",
                        format_duration(*horizon)
                    ),
                    "color": COLOR_WARN,
                }),
            ),
        };

        let mut payload = json!({
            "username": self.config.username,
            "embeds": [embed],
        });
        if let Some(content) = content {
            payload["content"] = Value::String(content);
        }
        payload
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CycleReport, RunOutcome, Server};

    fn worker(config: WebhookConfig) -> Worker {
        Worker {
            client: Client::new(),
            url: "http://localhost/hook".to_string(),
            config,
            last_error_sent: None,
        }
    }

    #[test]
    fn cycle_completed_with_failures_lists_failed_servers() {
        let report = CycleReport::new(vec![
            RunOutcome::success(Server::from("Cactuar"), Duration::from_secs(60)),
            RunOutcome::failure(Server::from("Adamantoise"), Duration::from_secs(10)),
        ]);
        let payload = worker(WebhookConfig::default()).render(&Event::CycleCompleted(report));

        let embed = &payload["embeds"][0];
        assert_eq!(embed["color"], COLOR_WARN);
        let failed = embed["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "Failed")
            .expect("failed field present");
        assert_eq!(failed["value"], "Adamantoise");
    }

    #[test]
    fn stall_alert_prepends_mention() {
        let config = WebhookConfig {
            mention: Some("<@1234>".to_string()),
            ..WebhookConfig::default()
        };
        let payload = worker(config).render(&Event::StallDetected {
            horizon: Duration::from_secs(86_400),
        });
        assert_eq!(payload["content"], "<@1234>");
        assert_eq!(payload["embeds"][0]["color"], COLOR_WARN);
    }

    #[test]
    fn error_window_throttles_back_to_back_errors() {
        let mut w = worker(WebhookConfig::default());
        assert!(w.error_window_open());
        w.last_error_sent = Some(Instant::now());
        assert!(!w.error_window_open());
    }

    #[test]
    fn durations_render_human_readable() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(150)), "2m 30s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
    }
}
