use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Transient failures talking to the upstream market API.
///
/// These are the errors the [`RateGovernor`](crate::governor::RateGovernor)
/// retries; they only surface to callers wrapped in
/// [`Error::PermanentDispatch`] once the retry budget is exhausted.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed upstream payload: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return UpstreamError::Timeout(Duration::ZERO);
        }
        match err.status() {
            Some(status) => UpstreamError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => UpstreamError::Transport(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream failure outside the governed dispatch path (startup fetches
    /// of the catalog, server list, and marketable-item list).
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A dispatch exhausted its retry budget. The affected server's update is
    /// marked failed; the cycle itself continues.
    #[error("dispatch to {target} failed permanently after {attempts} attempts: {source}")]
    PermanentDispatch {
        target: String,
        attempts: u32,
        #[source]
        source: UpstreamError,
    },

    /// The governor consumer stopped before the job completed.
    #[error("rate governor shut down before job completed")]
    GovernorClosed,

    /// Opaque failure from the cache updater collaborator. Handled exactly
    /// like a permanent dispatch failure for the server being updated.
    #[error("cache update failed: {0}")]
    CacheUpdate(String),

    #[error("snapshot store error: {0}")]
    Store(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures that should mark a single server's update as failed
    /// without aborting the surrounding cycle.
    #[must_use]
    pub fn is_server_scoped(&self) -> bool {
        matches!(
            self,
            Error::PermanentDispatch { .. } | Error::CacheUpdate(_) | Error::Store(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_dispatch_preserves_source() {
        let err = Error::PermanentDispatch {
            target: "https://upstream/a".to_string(),
            attempts: 10,
            source: UpstreamError::Status {
                status: 429,
                message: "too many requests".to_string(),
            },
        };

        assert!(err.to_string().contains("10 attempts"));
        assert!(err.is_server_scoped());
    }

    #[test]
    fn governor_closed_is_not_server_scoped() {
        assert!(!Error::GovernorClosed.is_server_scoped());
    }

    #[test]
    fn cache_update_is_server_scoped() {
        assert!(Error::CacheUpdate("recompute failed".to_string()).is_server_scoped());
    }
}
