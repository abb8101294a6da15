//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod catalog;
mod maintenance;
mod store;

pub use catalog::{CatalogRecord, CatalogSource};
pub use maintenance::{ClearTarget, MaintenanceRunner};
pub use store::{CacheError, CacheStore, StoreCapabilities, StoreInfo};
