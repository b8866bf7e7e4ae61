//! Market data fetch port.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ItemId, Server};
use crate::error::Result;

/// Fetches current market listings for a set of items on one server.
///
/// The production implementation chunks the request through the rate
/// governor; tests substitute scripted fetchers. A call blocks until every
/// underlying dispatch settles or the first permanent failure propagates.
#[async_trait]
pub trait MarketFetcher: Send + Sync {
    async fn fetch(&self, server: &Server, items: &[ItemId]) -> Result<HashMap<ItemId, Value>>;
}
