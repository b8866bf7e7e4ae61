//! Shared test doubles and fixture builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use profiteer::domain::{CatalogEntry, Ingredient, ItemCatalog, ItemId, Server};
use profiteer::error::{Error, Result, UpstreamError};
use profiteer::governor::Dispatch;
use profiteer::port::notifier::{Event, Notifier};
use profiteer::port::MarketFetcher;

/// Notifier that records every event for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloneable handle to the recorded events.
    pub fn events(&self) -> Arc<Mutex<Vec<Event>>> {
        Arc::clone(&self.events)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}

pub fn stall_count(events: &Arc<Mutex<Vec<Event>>>) -> usize {
    events
        .lock()
        .iter()
        .filter(|e| matches!(e, Event::StallDetected { .. }))
        .count()
}

/// Dispatcher that succeeds after an artificial delay, tracking how many
/// calls overlap.
pub struct CountingDispatch {
    pub delay: Duration,
    pub calls: AtomicUsize,
    current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl CountingDispatch {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Dispatch for CountingDispatch {
    type Output = Value;

    async fn dispatch(&self, _target: &str) -> std::result::Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({}))
    }
}

/// Dispatcher that records the simulated-clock instant of every call.
#[derive(Default)]
pub struct TimestampingDispatch {
    pub times: Mutex<Vec<tokio::time::Instant>>,
}

#[async_trait]
impl Dispatch for TimestampingDispatch {
    type Output = Value;

    async fn dispatch(&self, _target: &str) -> std::result::Result<Value, UpstreamError> {
        self.times.lock().push(tokio::time::Instant::now());
        Ok(json!({}))
    }
}

/// Dispatcher whose first `slow_calls` calls hang for `delay` before
/// answering; later calls answer immediately.
pub struct SlowDispatch {
    pub delay: Duration,
    pub slow_calls: usize,
    pub calls: AtomicUsize,
}

impl SlowDispatch {
    pub fn new(delay: Duration, slow_calls: usize) -> Self {
        Self {
            delay,
            slow_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Dispatch for SlowDispatch {
    type Output = Value;

    async fn dispatch(&self, _target: &str) -> std::result::Result<Value, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.slow_calls {
            tokio::time::sleep(self.delay).await;
        }
        Ok(json!({}))
    }
}

/// Dispatcher that fails every call with a transient upstream error.
#[derive(Default)]
pub struct AlwaysFailDispatch {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Dispatch for AlwaysFailDispatch {
    type Output = Value;

    async fn dispatch(&self, _target: &str) -> std::result::Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::Status {
            status: 503,
            message: "scripted outage".to_string(),
        })
    }
}

/// Dispatcher that records target URLs in completion order and fails any
/// target containing one of the poisoned substrings.
#[derive(Default)]
pub struct ScriptedDispatch {
    pub order: Mutex<Vec<String>>,
    pub poisoned: Vec<String>,
}

impl ScriptedDispatch {
    pub fn poisoning(substrings: &[&str]) -> Self {
        Self {
            order: Mutex::new(Vec::new()),
            poisoned: substrings.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl Dispatch for ScriptedDispatch {
    type Output = Value;

    async fn dispatch(&self, target: &str) -> std::result::Result<Value, UpstreamError> {
        self.order.lock().push(target.to_string());
        if self.poisoned.iter().any(|p| target.contains(p.as_str())) {
            return Err(UpstreamError::Status {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(listings_page_for(target))
    }
}

/// Build a multi-item listings page covering every id in a bulk-request URL.
fn listings_page_for(target: &str) -> Value {
    let ids = target.rsplit('/').next().unwrap_or_default();
    let items: serde_json::Map<String, Value> = ids
        .split(',')
        .filter_map(|id| id.parse::<u32>().ok())
        .map(|id| (id.to_string(), listing_snapshot(100 + i64::from(id), 5.0)))
        .collect();
    json!({ "items": items })
}

/// One listing snapshot as the upstream would return it.
pub fn listing_snapshot(price: i64, velocity: f64) -> Value {
    json!({
        "listings": [{ "pricePerUnit": price, "quantity": 99 }],
        "regularSaleVelocity": velocity,
    })
}

/// Fetcher double that skips the governor entirely.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub fail_servers: HashSet<String>,
    pub delays: HashMap<String, Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(servers: &[&str]) -> Self {
        Self {
            fail_servers: servers.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Make one server's fetch take `delay` of simulated time.
    pub fn with_delay(mut self, server: &str, delay: Duration) -> Self {
        self.delays.insert(server.to_string(), delay);
        self
    }
}

#[async_trait]
impl MarketFetcher for ScriptedFetcher {
    async fn fetch(&self, server: &Server, items: &[ItemId]) -> Result<HashMap<ItemId, Value>> {
        self.calls.lock().push(server.to_string());
        if let Some(delay) = self.delays.get(server.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_servers.contains(server.as_str()) {
            return Err(Error::PermanentDispatch {
                target: format!("scripted://{server}"),
                attempts: 10,
                source: UpstreamError::Status {
                    status: 500,
                    message: "scripted failure".to_string(),
                },
            });
        }
        Ok(items
            .iter()
            .map(|id| (*id, listing_snapshot(100 + i64::from(id.0), 5.0)))
            .collect())
    }
}

/// Catalog of `count` craftable items with ids starting at 1. Every item
/// after the first uses item 1 as its single ingredient.
pub fn sample_catalog(count: u32) -> ItemCatalog {
    let entries = (1..=count)
        .map(|id| {
            let requirements = (id > 1).then(|| {
                vec![Ingredient {
                    id: ItemId(1),
                    amount: 2,
                }]
            });
            (
                ItemId(id),
                CatalogEntry {
                    id: ItemId(id),
                    crafting: Some(json!([{ "lvl": 50 }])),
                    requirements,
                    ..CatalogEntry::default()
                },
            )
        })
        .collect();
    ItemCatalog::new(entries)
}
