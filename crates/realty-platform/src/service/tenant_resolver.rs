//! Tenant Resolver
//!
//! Maps a request host to the tenant that serves it. Lookups go cache
//! first, then the directory; development hosts bypass the cache and
//! resolve to a development tenant.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheAvailability, GuardedCache, KeyValueCache};
use crate::domain::Tenant;
use crate::error::{PlatformError, Result};
use crate::repository::TenantDirectory;

pub const TENANT_CACHE_PREFIX: &str = "tenant_domain_";

/// Domain every development tenant lookup prefers
pub const DEVELOPMENT_DOMAIN: &str = "localhost";

pub const DEFAULT_DEVELOPMENT_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "testserver"];

#[derive(Debug, Clone)]
pub struct TenantResolverConfig {
    pub cache_ttl: Duration,
    pub development_hosts: Vec<String>,
}

impl Default for TenantResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            development_hosts: DEFAULT_DEVELOPMENT_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    cache: GuardedCache,
    config: TenantResolverConfig,
}

impl TenantResolver {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        cache: Arc<dyn KeyValueCache>,
        config: TenantResolverConfig,
    ) -> Self {
        Self {
            directory,
            cache: GuardedCache::new(cache),
            config,
        }
    }

    pub fn cache_key(host: &str) -> String {
        format!("{}{}", TENANT_CACHE_PREFIX, host)
    }

    /// Hostname of a `Host` header value: port stripped, lower-cased.
    pub fn normalize_host(raw: &str) -> String {
        let raw = raw.trim();
        let host = if let Some(rest) = raw.strip_prefix('[') {
            // IPv6 literal, e.g. [::1]:8000
            rest.split(']').next().unwrap_or(rest)
        } else {
            raw.split(':').next().unwrap_or(raw)
        };
        host.to_ascii_lowercase()
    }

    pub fn is_development_host(&self, host: &str) -> bool {
        self.config.development_hosts.iter().any(|h| h == host)
    }

    pub async fn cache_availability(&self) -> CacheAvailability {
        self.cache.availability().await
    }

    /// Resolve an already normalized host to its tenant.
    pub async fn resolve(&self, host: &str) -> Result<Tenant> {
        if self.is_development_host(host) {
            return self.resolve_development().await;
        }

        let key = Self::cache_key(host);
        if let Some(tenant) = self.resolve_cached(host, &key).await? {
            return Ok(tenant);
        }

        match self.resolve_by_domain(host).await? {
            Some(tenant) => {
                self.cache.set(&key, &tenant.id, self.config.cache_ttl).await;
                debug!(host = %host, tenant_id = %tenant.id, "Tenant resolved from directory");
                Ok(tenant)
            }
            None => {
                info!(host = %host, "No tenant registered for domain");
                Err(PlatformError::TenantNotFound { domain: host.to_string() })
            }
        }
    }

    /// Tenant behind a cached id, evicting the entry if it went stale.
    async fn resolve_cached(&self, host: &str, key: &str) -> Result<Option<Tenant>> {
        let Some(tenant_id) = self.cache.get(key).await else {
            return Ok(None);
        };

        match self.directory.find_active_by_id(&tenant_id).await? {
            Some(tenant) => {
                debug!(host = %host, tenant_id = %tenant.id, "Tenant resolved from cache");
                Ok(Some(tenant))
            }
            None => {
                warn!(host = %host, tenant_id = %tenant_id, "Cached tenant is gone or inactive, evicting");
                self.cache.delete(key).await;
                Ok(None)
            }
        }
    }

    /// Exact primary-domain match first, then a scan over every active
    /// tenant's additional domains.
    pub async fn resolve_by_domain(&self, host: &str) -> Result<Option<Tenant>> {
        if let Some(tenant) = self.directory.find_active_by_primary_domain(host).await? {
            return Ok(Some(tenant));
        }

        let tenants = self.directory.find_active().await?;
        Ok(tenants.into_iter().find(|t| t.serves_domain(host)))
    }

    async fn resolve_development(&self) -> Result<Tenant> {
        if let Some(tenant) = self
            .directory
            .find_active_by_primary_domain(DEVELOPMENT_DOMAIN)
            .await?
        {
            return Ok(tenant);
        }

        match self.directory.find_first_active().await? {
            Some(tenant) => {
                debug!(tenant_id = %tenant.id, "No localhost tenant, using first active tenant");
                Ok(tenant)
            }
            None => {
                warn!("No active tenant available for development hosts");
                Err(PlatformError::DevelopmentTenantMissing)
            }
        }
    }

    /// Drop the cached mapping for `host`.
    pub async fn invalidate(&self, host: &str) {
        self.cache.delete(&Self::cache_key(host)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::repository::InMemoryTenantDirectory;

    fn resolver(tenants: Vec<Tenant>) -> (TenantResolver, Arc<InMemoryTenantDirectory>, Arc<MemoryCache>) {
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants(tenants));
        let cache = Arc::new(MemoryCache::new());
        let resolver = TenantResolver::new(
            directory.clone(),
            cache.clone(),
            TenantResolverConfig::default(),
        );
        (resolver, directory, cache)
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(TenantResolver::normalize_host("Acme.TEST:8000"), "acme.test");
        assert_eq!(TenantResolver::normalize_host("acme.test"), "acme.test");
        assert_eq!(TenantResolver::normalize_host("[::1]:8000"), "::1");
        assert_eq!(TenantResolver::normalize_host(""), "");
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(TenantResolver::cache_key("acme.test"), "tenant_domain_acme.test");
    }

    #[tokio::test]
    async fn test_resolves_primary_domain_and_caches() {
        let acme = Tenant::new("Acme", "acme.test");
        let (resolver, _, cache) = resolver(vec![acme.clone()]);

        let resolved = resolver.resolve("acme.test").await.unwrap();
        assert_eq!(resolved.id, acme.id);
        assert_eq!(
            cache.get("tenant_domain_acme.test").await.unwrap().as_deref(),
            Some(acme.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_resolves_additional_domain() {
        let acme = Tenant::new("Acme", "acme.test").with_additional_domains(["www.acme.test"]);
        let (resolver, _, _) = resolver(vec![Tenant::new("Beta", "beta.test"), acme.clone()]);

        let resolved = resolver.resolve("www.acme.test").await.unwrap();
        assert_eq!(resolved.id, acme.id);
    }

    #[tokio::test]
    async fn test_unknown_domain_is_not_cached() {
        let (resolver, _, cache) = resolver(vec![Tenant::new("Acme", "acme.test")]);

        let err = resolver.resolve("nowhere.test").await.unwrap_err();
        assert!(matches!(err, PlatformError::TenantNotFound { .. }));
        assert!(cache.get("tenant_domain_nowhere.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_tenant_is_not_resolved() {
        let (resolver, _, _) = resolver(vec![Tenant::new("Acme", "acme.test").inactive()]);
        assert!(resolver.resolve("acme.test").await.is_err());
    }

    #[tokio::test]
    async fn test_development_host_prefers_localhost_tenant() {
        let local = Tenant::new("Local", "localhost");
        let (resolver, _, cache) = resolver(vec![Tenant::new("Acme", "acme.test"), local.clone()]);

        let resolved = resolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(resolved.id, local.id);
        assert!(cache.get("tenant_domain_127.0.0.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_development_host_without_any_tenant_fails() {
        let (resolver, _, _) = resolver(vec![Tenant::new("Dormant", "dormant.test").inactive()]);
        let err = resolver.resolve("localhost").await.unwrap_err();
        assert!(matches!(err, PlatformError::DevelopmentTenantMissing));
    }

    #[tokio::test]
    async fn test_invalidate_drops_mapping() {
        let (resolver, _, cache) = resolver(vec![Tenant::new("Acme", "acme.test")]);
        resolver.resolve("acme.test").await.unwrap();
        resolver.invalidate("acme.test").await;
        assert!(cache.get("tenant_domain_acme.test").await.unwrap().is_none());
    }
}
