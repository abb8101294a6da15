//! Domain-level error types.

use thiserror::Error;

/// Invalid cache settings, detected once at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid key prefix for {entity}: {reason}")]
    InvalidPrefix {
        entity: &'static str,
        reason: String,
    },

    #[error("TTL tier {0} must be greater than zero")]
    ZeroTtl(&'static str),
}

/// System-of-record errors surfaced to the warm-up routine.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Catalog connection failed: {0}")]
    Connection(String),

    #[error("Catalog query failed: {0}")]
    Query(String),

    #[error("Catalog record could not be decoded: {0}")]
    Decode(String),
}

/// Administrative command failures.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("Failed to start maintenance command: {0}")]
    Spawn(String),

    #[error("Maintenance command failed: {0}")]
    Failed(String),
}
