//! TTL tiers and the durations each tier maps to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The four TTL tiers every cached entity is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlTier {
    /// Frequently changing data such as order history.
    Short,
    Medium,
    Long,
    VeryLong,
}

impl TtlTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtlTier::Short => "short",
            TtlTier::Medium => "medium",
            TtlTier::Long => "long",
            TtlTier::VeryLong => "very_long",
        }
    }
}

/// Concrete durations for each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    pub very_long: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(300),
            medium: Duration::from_secs(1800),
            long: Duration::from_secs(3600),
            very_long: Duration::from_secs(86400),
        }
    }
}

impl TtlPolicy {
    /// Resolve a tier to its configured duration.
    pub fn duration(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Short => self.short,
            TtlTier::Medium => self.medium,
            TtlTier::Long => self.long,
            TtlTier::VeryLong => self.very_long,
        }
    }

    pub(crate) fn tiers(&self) -> [(TtlTier, Duration); 4] {
        [
            (TtlTier::Short, self.short),
            (TtlTier::Medium, self.medium),
            (TtlTier::Long, self.long),
            (TtlTier::VeryLong, self.very_long),
        ]
    }
}
