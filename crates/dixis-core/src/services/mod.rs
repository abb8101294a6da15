//! Services - the cache facade built on top of the ports.

mod admin;
mod caching;
mod index;

pub use admin::FlushConfirmation;
pub use caching::CacheFacade;
