use std::fmt;

use async_trait::async_trait;

use crate::error::MaintenanceError;

/// Application-level caches outside the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearTarget {
    Config,
    Route,
    View,
}

impl ClearTarget {
    pub const ALL: [ClearTarget; 3] = [ClearTarget::Config, ClearTarget::Route, ClearTarget::View];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClearTarget::Config => "config",
            ClearTarget::Route => "route",
            ClearTarget::View => "view",
        }
    }
}

impl fmt::Display for ClearTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque administrative command runner, used only by a full flush.
#[async_trait]
pub trait MaintenanceRunner: Send + Sync {
    async fn clear(&self, target: ClearTarget) -> Result<(), MaintenanceError>;
}
