//! Background jobs.

mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig, schedule_warm_up};
