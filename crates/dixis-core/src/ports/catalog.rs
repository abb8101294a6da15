use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One identified record read from the system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: u64,
    pub data: serde_json::Value,
}

/// Read queries used to warm the cache ahead of demand.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Active, featured products with their producer and category.
    async fn featured_products(&self, limit: usize) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Root categories ordered by name, each with its children.
    async fn category_tree(&self) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Verified producers.
    async fn verified_producers(&self, limit: usize) -> Result<Vec<CatalogRecord>, SourceError>;
}
