//! Administrative command runners used by a full cache flush.

mod shell;

pub use shell::{MaintenanceConfig, NoopMaintenanceRunner, ShellMaintenanceRunner};
