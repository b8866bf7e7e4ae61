//! Trait seams between the update core and its collaborators.

pub mod cache;
pub mod fetcher;
pub mod notifier;
pub mod store;

pub use cache::CacheUpdater;
pub use fetcher::MarketFetcher;
pub use notifier::{Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier};
pub use store::{keys, SnapshotStore};
