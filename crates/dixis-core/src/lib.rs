//! # Dixis Core
//!
//! The caching policy layer of the Dixis marketplace.
//! Maps domain entities to cache keys, TTL tiers and invalidation rules on top
//! of any backing store that implements [`ports::CacheStore`].
//!
//! This crate has zero infrastructure dependencies; adapters live in
//! `dixis-infra`.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::ConfigError;
pub use services::CacheFacade;
