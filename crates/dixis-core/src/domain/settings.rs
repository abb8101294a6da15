//! Immutable facade configuration, injected at construction.

use crate::domain::keys::KeyPrefixes;
use crate::domain::ttl::TtlPolicy;
use crate::error::ConfigError;

/// Which reverse indices the facade maintains in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPolicy {
    /// Track product id -> slug so invalidation can evict the slug alias
    /// even when the caller does not know the slug.
    pub slug_aliases: bool,
    /// Track user id -> product ids with cached B2B pricing, so pricing
    /// invalidation works without store-side pattern scans.
    pub b2b_pricing: bool,
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self {
            slug_aliases: false,
            b2b_pricing: true,
        }
    }
}

/// What a failed cache write or invalidation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Return the error to the caller. Meant for development.
    Propagate,
    /// Log at warn level and report success.
    #[default]
    LogAndContinue,
}

/// How many records warm-up pulls from the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmUpLimits {
    pub featured_products: usize,
    pub verified_producers: usize,
}

impl Default for WarmUpLimits {
    fn default() -> Self {
        Self {
            featured_products: 10,
            verified_producers: 20,
        }
    }
}

/// Full facade configuration.
#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    pub ttl: TtlPolicy,
    pub prefixes: KeyPrefixes,
    pub index: IndexPolicy,
    pub write_failures: WriteFailurePolicy,
    pub warm_up: WarmUpLimits,
}

impl CacheSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tier, duration) in self.ttl.tiers() {
            if duration.is_zero() {
                return Err(ConfigError::ZeroTtl(tier.as_str()));
            }
        }
        self.prefixes.validate()
    }
}
