//! # Dixis Infrastructure
//!
//! Concrete implementations of the ports defined in `dixis-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL catalog via SeaORM
//! - `redis` - Redis cache store

pub mod cache;
pub mod catalog;
pub mod maintenance;

// Re-exports - In-Memory
pub use cache::InMemoryStore;
pub use catalog::{CatalogSection, CatalogSeed, InMemoryCatalog};
pub use maintenance::{MaintenanceConfig, NoopMaintenanceRunner, ShellMaintenanceRunner};

#[cfg(feature = "postgres")]
pub use catalog::{CatalogConfig, PostgresCatalog};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisConfig, RedisStore};
