//! Domain types - keys, TTL tiers, settings and report shapes.

mod keys;
mod report;
mod settings;
mod stats;
mod ttl;

pub use keys::{CacheKey, Entity, KeyPrefixes, KeySpace};
pub use report::{ClearReport, SectionOutcome, SectionReport, WarmUpReport};
pub use settings::{CacheSettings, IndexPolicy, WarmUpLimits, WriteFailurePolicy};
pub use stats::{CacheStats, hit_rate};
pub use ttl::{TtlPolicy, TtlTier};
