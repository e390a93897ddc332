//! Best-effort wrapper around a [`KeyValueCache`].
//!
//! The backend is probed once (a write followed by a read). If the probe
//! fails every later operation is skipped: reads miss, writes and deletes
//! do nothing. Individual operation errors after a good probe are swallowed
//! the same way, so callers only ever lose performance, never correctness.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{CacheError, KeyValueCache};

const PROBE_KEY: &str = "_cache_probe";

/// Result of the one-time backend probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAvailability {
    Available,
    Unavailable,
}

pub struct GuardedCache {
    backend: Arc<dyn KeyValueCache>,
    availability: OnceCell<CacheAvailability>,
}

impl GuardedCache {
    pub fn new(backend: Arc<dyn KeyValueCache>) -> Self {
        Self {
            backend,
            availability: OnceCell::new(),
        }
    }

    /// Probe the backend on first use and remember the outcome.
    pub async fn availability(&self) -> CacheAvailability {
        *self
            .availability
            .get_or_init(|| async {
                let probe = async {
                    self.backend.set(PROBE_KEY, "1", Duration::from_secs(1)).await?;
                    self.backend.get(PROBE_KEY).await?;
                    Ok::<_, CacheError>(())
                };
                match probe.await {
                    Ok(_) => {
                        debug!(backend = self.backend.name(), "Cache backend available");
                        CacheAvailability::Available
                    }
                    Err(e) => {
                        warn!(backend = self.backend.name(), "Cache not available, caching disabled: {}", e);
                        CacheAvailability::Unavailable
                    }
                }
            })
            .await
    }

    async fn enabled(&self) -> bool {
        self.availability().await == CacheAvailability::Available
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.enabled().await {
            return None;
        }
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(key, "Cache get failed: {}", e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if !self.enabled().await {
            return;
        }
        if let Err(e) = self.backend.set(key, value, ttl).await {
            debug!(key, "Cache set failed: {}", e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if !self.enabled().await {
            return;
        }
        if let Err(e) = self.backend.delete(key).await {
            debug!(key, "Cache delete failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheResult, MemoryCache};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that fails every call and counts attempts
    #[derive(Default)]
    struct DownCache {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueCache for DownCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn take(&self, _key: &str) -> CacheResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection refused".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_available_backend_passes_through() {
        let cache = GuardedCache::new(Arc::new(MemoryCache::new()));
        assert_eq!(cache.availability().await, CacheAvailability::Available);

        cache.set("k", "v", Duration::from_secs(5)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_probed_once_then_skipped() {
        let backend = Arc::new(DownCache::default());
        let cache = GuardedCache::new(backend.clone());

        assert_eq!(cache.get("k").await, None);
        // the probe write failed, the read was never attempted
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        cache.set("k", "v", Duration::from_secs(5)).await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.availability().await, CacheAvailability::Unavailable);
    }
}
