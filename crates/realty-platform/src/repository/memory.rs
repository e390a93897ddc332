//! In-memory storage
//!
//! Backs the `memory` storage mode and the test suites. Maps keep insertion
//! order so "first active tenant" is deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{AgencyStore, PropertyStore, TenantDirectory, TokenBlacklist, UserStore};
use crate::domain::{Agency, Property, Tenant, User};
use crate::error::{PlatformError, Result};

/// Tenant directory held in process memory
#[derive(Default)]
pub struct InMemoryTenantDirectory {
    tenants: RwLock<IndexMap<String, Tenant>>,
    queries: AtomicUsize,
    domain_lookups: AtomicUsize,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        let directory = Self::new();
        {
            let mut map = directory.tenants.write();
            for tenant in tenants {
                map.insert(tenant.id.clone(), tenant);
            }
        }
        directory
    }

    /// Number of lookups served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Lookups by domain (primary match or active scan)
    pub fn domain_lookup_count(&self) -> usize {
        self.domain_lookups.load(Ordering::SeqCst)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn record_domain_lookup(&self) {
        self.record_query();
        self.domain_lookups.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn insert(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write();
        if tenants.values().any(|t| t.domain == tenant.domain) {
            return Err(PlatformError::duplicate("Tenant", "domain", &tenant.domain));
        }
        if tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(PlatformError::duplicate("Tenant", "slug", &tenant.slug));
        }
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write();
        match tenants.get_mut(&tenant.id) {
            Some(existing) => {
                *existing = tenant.clone();
                Ok(())
            }
            None => Err(PlatformError::not_found("Tenant", &tenant.id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.tenants.write().shift_remove(id).is_some())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        self.record_query();
        Ok(self.tenants.read().get(id).cloned())
    }

    async fn find_active_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        self.record_query();
        Ok(self.tenants.read().get(id).filter(|t| t.is_active).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        self.record_query();
        Ok(self.tenants.read().values().find(|t| t.slug == slug).cloned())
    }

    async fn find_active_by_primary_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        self.record_domain_lookup();
        Ok(self
            .tenants
            .read()
            .values()
            .find(|t| t.is_active && t.domain == domain)
            .cloned())
    }

    async fn find_first_active(&self) -> Result<Option<Tenant>> {
        self.record_query();
        Ok(self.tenants.read().values().find(|t| t.is_active).cloned())
    }

    async fn find_active(&self) -> Result<Vec<Tenant>> {
        self.record_domain_lookup();
        Ok(self
            .tenants
            .read()
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<IndexMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(PlatformError::duplicate("User", "email", &user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(PlatformError::not_found("User", &user.id)),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email == email).cloned())
    }

    async fn clear_agency(&self, agency_id: &str) -> Result<u64> {
        let mut cleared = 0;
        for user in self.users.write().values_mut() {
            if user.agency_id.as_deref() == Some(agency_id) {
                user.agency_id = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[derive(Default)]
pub struct InMemoryAgencyRepository {
    agencies: RwLock<IndexMap<String, Agency>>,
}

impl InMemoryAgencyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgencyStore for InMemoryAgencyRepository {
    async fn insert(&self, agency: &Agency) -> Result<()> {
        let mut agencies = self.agencies.write();
        if agencies.values().any(|a| a.tenant_id == agency.tenant_id) {
            return Err(PlatformError::duplicate("Agency", "tenantId", &agency.tenant_id));
        }
        agencies.insert(agency.id.clone(), agency.clone());
        Ok(())
    }

    async fn update(&self, agency: &Agency) -> Result<()> {
        let mut agencies = self.agencies.write();
        match agencies.get_mut(&agency.id) {
            Some(existing) => {
                *existing = agency.clone();
                Ok(())
            }
            None => Err(PlatformError::not_found("Agency", &agency.id)),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Agency>> {
        Ok(self.agencies.read().get(id).cloned())
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<Agency>> {
        Ok(self
            .agencies
            .read()
            .values()
            .find(|a| a.tenant_id == tenant_id)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.agencies.write().shift_remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryPropertyRepository {
    properties: RwLock<IndexMap<String, Property>>,
}

impl InMemoryPropertyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }
}

#[async_trait]
impl PropertyStore for InMemoryPropertyRepository {
    async fn insert(&self, property: &Property) -> Result<()> {
        let mut properties = self.properties.write();
        if properties.values().any(|p| p.reference == property.reference) {
            return Err(PlatformError::duplicate("Property", "reference", &property.reference));
        }
        properties.insert(property.id.clone(), property.clone());
        Ok(())
    }

    async fn update(&self, property: &Property) -> Result<()> {
        let mut properties = self.properties.write();
        match properties.get_mut(&property.id) {
            Some(existing) => {
                *existing = property.clone();
                Ok(())
            }
            None => Err(PlatformError::not_found("Property", &property.id)),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Property>> {
        Ok(self.properties.read().get(id).cloned())
    }

    async fn find_published_by_agency(&self, agency_id: &str) -> Result<Vec<Property>> {
        Ok(self
            .properties
            .read()
            .values()
            .filter(|p| p.agency_id == agency_id && p.is_published)
            .cloned()
            .collect())
    }

    async fn delete_by_agency(&self, agency_id: &str) -> Result<u64> {
        let mut properties = self.properties.write();
        let before = properties.len();
        properties.retain(|_, p| p.agency_id != agency_id);
        Ok((before - properties.len()) as u64)
    }
}

/// Blacklist entries expire with the token they revoke
#[derive(Default)]
pub struct InMemoryTokenBlacklist {
    entries: RwLock<IndexMap<String, DateTime<Utc>>>,
}

impl InMemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        entries.retain(|_, expiry| *expiry > now);
        if entries.contains_key(jti) {
            return Ok(false);
        }
        entries.insert(jti.to_string(), expires_at);
        Ok(true)
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        Ok(self
            .entries
            .read()
            .get(jti)
            .is_some_and(|expiry| *expiry > Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, ListingType};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn property(agency_id: &str, title: &str) -> Property {
        Property::new(
            agency_id,
            title,
            ListingType::Sale,
            Decimal::new(1_000_000, 0),
            Location::new("16", "Alger"),
            Location::new("1601", "Alger Centre"),
            90,
        )
    }

    #[tokio::test]
    async fn test_first_active_follows_insertion_order() {
        let directory = InMemoryTenantDirectory::with_tenants([
            Tenant::new("Dormant", "dormant.test").inactive(),
            Tenant::new("Acme", "acme.test"),
            Tenant::new("Beta", "beta.test"),
        ]);
        let first = directory.find_first_active().await.unwrap().unwrap();
        assert_eq!(first.name, "Acme");
        assert_eq!(directory.find_active().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_primary_domain_lookup_ignores_inactive() {
        let directory = InMemoryTenantDirectory::with_tenants([
            Tenant::new("Dormant", "dormant.test").inactive(),
        ]);
        assert!(directory
            .find_active_by_primary_domain("dormant.test")
            .await
            .unwrap()
            .is_none());
        assert_eq!(directory.query_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_tenant_domain_rejected() {
        let directory = InMemoryTenantDirectory::new();
        directory.insert(&Tenant::new("Acme", "acme.test")).await.unwrap();
        let err = directory
            .insert(&Tenant::new("Other", "acme.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_user_email_rejected() {
        let users = InMemoryUserRepository::new();
        users.insert(&User::new("a@x.com")).await.unwrap();
        let err = users.insert(&User::new("a@x.com")).await.unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { .. }));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_agency_detaches_users() {
        let users = InMemoryUserRepository::new();
        users.insert(&User::new("a@x.com").with_agency("ag-1")).await.unwrap();
        users.insert(&User::new("b@x.com").with_agency("ag-2")).await.unwrap();

        assert_eq!(users.clear_agency("ag-1").await.unwrap(), 1);
        let a = users.find_by_email("a@x.com").await.unwrap().unwrap();
        let b = users.find_by_email("b@x.com").await.unwrap().unwrap();
        assert!(a.agency_id.is_none());
        assert_eq!(b.agency_id.as_deref(), Some("ag-2"));
    }

    #[tokio::test]
    async fn test_published_filter_and_cascade() {
        let properties = InMemoryPropertyRepository::new();
        let mut hidden = property("ag-1", "Hidden");
        hidden.is_published = false;
        properties.insert(&property("ag-1", "Villa")).await.unwrap();
        properties.insert(&hidden).await.unwrap();
        properties.insert(&property("ag-2", "Studio")).await.unwrap();

        let listed = properties.find_published_by_agency("ag-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Villa");

        assert_eq!(properties.delete_by_agency("ag-1").await.unwrap(), 2);
        assert_eq!(properties.len(), 1);
    }

    #[tokio::test]
    async fn test_blacklist_entries_expire() {
        let blacklist = InMemoryTokenBlacklist::new();
        assert!(blacklist
            .blacklist("live", Utc::now() + Duration::hours(1))
            .await
            .unwrap());
        assert!(!blacklist
            .blacklist("live", Utc::now() + Duration::hours(1))
            .await
            .unwrap());
        blacklist
            .blacklist("stale", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        assert!(blacklist.is_blacklisted("live").await.unwrap());
        assert!(!blacklist.is_blacklisted("stale").await.unwrap());
        assert!(!blacklist.is_blacklisted("unknown").await.unwrap());
    }
}
