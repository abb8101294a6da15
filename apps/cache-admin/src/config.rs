//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use dixis_core::domain::{CacheSettings, IndexPolicy, TtlPolicy, WarmUpLimits, WriteFailurePolicy};
use dixis_infra::MaintenanceConfig;

#[cfg(feature = "postgres")]
use dixis_infra::CatalogConfig;
#[cfg(feature = "redis")]
use dixis_infra::RedisConfig;

#[cfg(feature = "scheduler")]
use crate::background::SchedulerConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cache: CacheSettings,
    /// `Some` only when `REDIS_URL` is set; otherwise the in-memory store is used.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    #[cfg(feature = "postgres")]
    pub catalog: Option<CatalogConfig>,
    /// JSON seed for the in-memory catalog.
    pub catalog_seed: Option<String>,
    pub maintenance: MaintenanceConfig,
    #[cfg(feature = "scheduler")]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_parse("PORT").unwrap_or(8080),
            cache: cache_settings_from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            #[cfg(feature = "postgres")]
            catalog: CatalogConfig::from_env(),
            catalog_seed: env::var("CATALOG_SEED_PATH").ok(),
            maintenance: MaintenanceConfig::from_env(),
            #[cfg(feature = "scheduler")]
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Cache settings with per-environment TTL tuning.
///
/// Writes fail loudly when `APP_ENV=development` unless `CACHE_STRICT_WRITES`
/// says otherwise.
pub fn cache_settings_from_env() -> CacheSettings {
    let defaults = CacheSettings::default();
    let secs = |name: &str, fallback: Duration| {
        env_parse::<u64>(name)
            .map(Duration::from_secs)
            .unwrap_or(fallback)
    };

    let development = env::var("APP_ENV")
        .map(|v| v.eq_ignore_ascii_case("development"))
        .unwrap_or(false);
    let strict = env_flag("CACHE_STRICT_WRITES").unwrap_or(development);

    CacheSettings {
        ttl: TtlPolicy {
            short: secs("CACHE_TTL_SHORT_SECS", defaults.ttl.short),
            medium: secs("CACHE_TTL_MEDIUM_SECS", defaults.ttl.medium),
            long: secs("CACHE_TTL_LONG_SECS", defaults.ttl.long),
            very_long: secs("CACHE_TTL_VERY_LONG_SECS", defaults.ttl.very_long),
        },
        index: IndexPolicy {
            slug_aliases: env_flag("CACHE_INDEX_SLUGS").unwrap_or(defaults.index.slug_aliases),
            b2b_pricing: env_flag("CACHE_INDEX_B2B_PRICING")
                .unwrap_or(defaults.index.b2b_pricing),
        },
        write_failures: if strict {
            WriteFailurePolicy::Propagate
        } else {
            WriteFailurePolicy::LogAndContinue
        },
        warm_up: WarmUpLimits {
            featured_products: env_parse("CACHE_WARMUP_FEATURED_LIMIT")
                .unwrap_or(defaults.warm_up.featured_products),
            verified_producers: env_parse("CACHE_WARMUP_PRODUCERS_LIMIT")
                .unwrap_or(defaults.warm_up.verified_producers),
        },
        prefixes: defaults.prefixes,
    }
}
