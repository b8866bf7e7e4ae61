//! Upstream HTTP access: the governed dispatcher and the startup endpoints.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::domain::{ItemId, Server};
use crate::error::{Result, UpstreamError};
use crate::governor::Dispatch;

/// Reqwest-backed [`Dispatch`] implementation.
///
/// Every governed upstream call is a GET returning JSON.
pub struct HttpDispatcher {
    http: reqwest::Client,
}

impl HttpDispatcher {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    type Output = Value;

    async fn dispatch(&self, target: &str) -> std::result::Result<Value, UpstreamError> {
        let response = self.http.get(target).send().await.map_err(UpstreamError::from)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| UpstreamError::Payload(err.to_string()))
    }
}

/// Client for the upstream endpoints hit once at startup, plus URL building
/// for the governed bulk-listing dispatches.
pub struct MarketApiClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl MarketApiClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    /// Fetch the game-server list. Loaded once; order is preserved.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or an empty list (an empty list would make
    /// every cycle a silent no-op).
    pub async fn server_list(&self) -> Result<Vec<Server>> {
        let servers: Vec<Server> = self.get_json(&self.config.server_list_url).await?;
        if servers.is_empty() {
            return Err(UpstreamError::Payload("server list is empty".to_string()).into());
        }
        Ok(servers)
    }

    /// Fetch the ids of all marketable items.
    pub async fn marketable_items(&self) -> Result<Vec<ItemId>> {
        let url = format!("{}/marketable", self.config.api_url.trim_end_matches('/'));
        let ids: Vec<ItemId> = self.get_json(&url).await?;
        Ok(ids)
    }

    /// URL of one bulk-listing dispatch for up to `chunk_size` items.
    #[must_use]
    pub fn listings_url(&self, server: &Server, items: &[ItemId]) -> String {
        let ids = items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            server,
            ids
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await.map_err(UpstreamError::from)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        response
            .json::<T>()
            .await
            .map_err(|err| UpstreamError::Payload(err.to_string()).into())
    }
}
