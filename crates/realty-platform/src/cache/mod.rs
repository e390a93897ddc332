//! Cache Layer
//!
//! Best-effort key/value store with per-entry TTL. Backed by Redis in
//! production and by a process-local map in development and tests.

pub mod guarded;
pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use guarded::{CacheAvailability, GuardedCache};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Atomic single-key operations on a TTL-backed store
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Read and remove in one step; of two concurrent takes only one sees the value.
    async fn take(&self, key: &str) -> CacheResult<Option<String>>;

    /// Backend name for logs
    fn name(&self) -> &str;
}
