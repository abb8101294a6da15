//! System-of-record adapters used by cache warm-up.

mod memory;

pub use memory::{CatalogSection, CatalogSeed, InMemoryCatalog};

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::{CatalogConfig, PostgresCatalog};
