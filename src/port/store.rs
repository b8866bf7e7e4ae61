//! Key-value snapshot store port.

use async_trait::async_trait;

use crate::error::Result;

/// Key naming for the shared key-value store.
///
/// Raw listing snapshots use one independent key per `(server, item)` pair so
/// concurrent writes never need cross-key coordination; last-write-wins is
/// the only consistency guarantee.
pub mod keys {
    use crate::domain::{ItemId, Server};

    /// Raw upstream listing payload for one item on one server.
    #[must_use]
    pub fn snapshot(server: &Server, item: ItemId) -> String {
        format!("mb:{server}:{item}")
    }

    /// Ranked profit array for one server.
    #[must_use]
    pub fn profit(server: &Server) -> String {
        format!("profit:{server}")
    }

    /// Millisecond timestamp of the server's last completed update.
    #[must_use]
    pub fn profit_updated(server: &Server) -> String {
        format!("profit:{server}:updated")
    }

    /// Free-form updater status line.
    pub const STATUS: &str = "status";
}

/// Async key-value store for raw snapshots and computed profit arrays.
///
/// Values are serialized JSON strings. Implementations must be safe for
/// concurrent writers; per-key last-write-wins semantics are sufficient.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;
}
