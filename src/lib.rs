//! Rate-governed market data aggregation for a multiplayer-game economy.
//!
//! The updater sweeps every game server, fetches current market listings for
//! all tradeable items in governed chunks, recomputes per-server profit
//! rankings, and serves them over a small read-only HTTP API. Upstream
//! pacing is the central constraint: every listing request flows through a
//! single [`governor::RateGovernor`] that enforces the provider's published
//! rate limits with headroom to spare.

pub mod adapter;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod governor;
pub mod orchestrator;
pub mod port;
pub mod runtime;

pub use error::{Error, Result};
