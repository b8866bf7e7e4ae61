//! Cache updater port.

use async_trait::async_trait;

use crate::domain::{ItemCatalog, Server};
use crate::error::Result;
use crate::port::store::SnapshotStore;

/// Collaborator that recomputes ranked profit arrays from raw snapshots.
///
/// The contract is deliberately narrow: given the servers whose snapshots
/// just changed, the shared catalog, and the store, rewrite each server's
/// `profit:<server>` array in full. The recompute must be a pure function of
/// snapshots + catalog so repeated runs never accumulate duplicates.
///
/// An opaque failure here marks the affected server's update as failed, the
/// same way a permanent dispatch failure would.
#[async_trait]
pub trait CacheUpdater: Send + Sync {
    async fn update(
        &self,
        servers: &[Server],
        catalog: &ItemCatalog,
        store: &dyn SnapshotStore,
    ) -> Result<()>;
}
