//! Cache store implementations - Redis and in-memory fallback.

mod memory;
mod pattern;

pub use memory::InMemoryStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisStore};
