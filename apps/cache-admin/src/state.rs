//! Application state - shared across all handlers.

use std::sync::Arc;

use dixis_core::CacheFacade;
use dixis_core::ports::{CacheStore, CatalogSource, MaintenanceRunner};
use dixis_infra::{InMemoryCatalog, InMemoryStore, NoopMaintenanceRunner, ShellMaintenanceRunner};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheFacade>,
}

impl AppState {
    pub fn new(cache: CacheFacade) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = build_store(config).await?;
        let catalog = build_catalog(config).await?;

        let maintenance: Arc<dyn MaintenanceRunner> =
            match ShellMaintenanceRunner::from_config(&config.maintenance) {
                Some(runner) => Arc::new(runner),
                None => Arc::new(NoopMaintenanceRunner),
            };

        let cache = CacheFacade::new(store, config.cache.clone())?
            .with_catalog(catalog)
            .with_maintenance(maintenance);

        tracing::info!("Application state initialized");
        Ok(Self::new(cache))
    }
}

#[cfg(feature = "redis")]
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    use dixis_infra::RedisStore;

    let Some(redis) = &config.redis else {
        tracing::warn!("REDIS_URL not set. Using in-memory cache store.");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    match RedisStore::new(redis.clone()).await {
        Ok(store) => Ok(Arc::new(store)),
        Err(e) if redis.fallback_to_memory => {
            tracing::error!(
                "Failed to connect to Redis: {}. Using in-memory fallback.",
                e
            );
            Ok(Arc::new(InMemoryStore::new()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(feature = "redis"))]
async fn build_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    tracing::info!("Running without redis feature - using in-memory cache store");
    Ok(Arc::new(InMemoryStore::new()))
}

async fn build_catalog(config: &AppConfig) -> anyhow::Result<Arc<dyn CatalogSource>> {
    #[cfg(feature = "postgres")]
    {
        if let Some(db) = &config.catalog {
            match dixis_infra::PostgresCatalog::connect(db).await {
                Ok(catalog) => return Ok(Arc::new(catalog)),
                Err(e) => tracing::error!(
                    "Failed to connect to catalog database: {}. Falling back to seed catalog.",
                    e
                ),
            }
        }
    }

    match &config.catalog_seed {
        Some(path) => Ok(Arc::new(InMemoryCatalog::from_file(path).await?)),
        None => {
            tracing::warn!("No catalog configured. Warm-up will cache empty collections.");
            Ok(Arc::new(InMemoryCatalog::default()))
        }
    }
}
