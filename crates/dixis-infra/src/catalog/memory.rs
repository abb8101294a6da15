//! In-memory catalog, seeded from code or a JSON file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dixis_core::error::SourceError;
use dixis_core::ports::{CatalogRecord, CatalogSource};

/// Catalog contents, in the shape the warm-up queries return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub featured_products: Vec<serde_json::Value>,
    #[serde(default)]
    pub category_tree: Vec<serde_json::Value>,
    #[serde(default)]
    pub verified_producers: Vec<CatalogRecord>,
}

/// One of the three warm-up reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogSection {
    FeaturedProducts,
    CategoryTree,
    VerifiedProducers,
}

/// Catalog used when no database is configured.
///
/// Sections can be switched to fail with a query error, to rehearse a
/// partial outage of the system of record.
pub struct InMemoryCatalog {
    seed: CatalogSeed,
    failures: HashMap<CatalogSection, String>,
}

impl InMemoryCatalog {
    pub fn new(seed: CatalogSeed) -> Self {
        Self {
            seed,
            failures: HashMap::new(),
        }
    }

    /// Make every read of `section` fail with `error`.
    pub fn failing(mut self, section: CatalogSection, error: impl Into<String>) -> Self {
        self.failures.insert(section, error.into());
        self
    }

    fn check(&self, section: CatalogSection) -> Result<(), SourceError> {
        match self.failures.get(&section) {
            Some(error) => Err(SourceError::Query(error.clone())),
            None => Ok(()),
        }
    }

    /// Load a seed from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Connection(format!("{}: {e}", path.display())))?;
        let seed: CatalogSeed =
            serde_json::from_str(&raw).map_err(|e| SourceError::Decode(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            featured = seed.featured_products.len(),
            categories = seed.category_tree.len(),
            producers = seed.verified_producers.len(),
            "Catalog seed loaded"
        );
        Ok(Self::new(seed))
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new(CatalogSeed::default())
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn featured_products(&self, limit: usize) -> Result<Vec<serde_json::Value>, SourceError> {
        self.check(CatalogSection::FeaturedProducts)?;
        Ok(self.seed.featured_products.iter().take(limit).cloned().collect())
    }

    async fn category_tree(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        self.check(CatalogSection::CategoryTree)?;
        Ok(self.seed.category_tree.clone())
    }

    async fn verified_producers(&self, limit: usize) -> Result<Vec<CatalogRecord>, SourceError> {
        self.check(CatalogSection::VerifiedProducers)?;
        Ok(self
            .seed
            .verified_producers
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }
}
