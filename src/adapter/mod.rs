//! Concrete implementations of the port traits.

pub mod cache;
pub mod memory;
pub mod webhook;

pub use cache::ProfitCacheUpdater;
pub use memory::MemoryStore;
pub use webhook::WebhookNotifier;
