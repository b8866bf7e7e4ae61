//! Core domain types: item catalog, servers, cycle reports, and the stored
//! profit-record schema.

pub mod catalog;
pub mod profit;
pub mod report;
pub mod server;

pub use catalog::{CatalogEntry, Ingredient, ItemCatalog, ItemId};
pub use profit::{ProfitEstimate, ProfitRecord};
pub use report::{CycleReport, RunOutcome};
pub use server::Server;
