//! Repository Layer
//!
//! Storage traits used by the services, with MongoDB implementations for
//! production and in-memory implementations for development and tests.

pub mod agency;
pub mod indexes;
pub mod memory;
pub mod property;
pub mod tenant;
pub mod token_blacklist;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::error::{ErrorKind, WriteFailure};

use crate::domain::{Agency, Property, Tenant, User};
use crate::error::Result;

pub use agency::AgencyRepository;
pub use indexes::ensure_indexes;
pub use memory::{
    InMemoryAgencyRepository, InMemoryPropertyRepository, InMemoryTenantDirectory,
    InMemoryTokenBlacklist, InMemoryUserRepository,
};
pub use property::PropertyRepository;
pub use tenant::TenantRepository;
pub use token_blacklist::TokenBlacklistRepository;
pub use user::UserRepository;

/// Persistent store of tenant records
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn insert(&self, tenant: &Tenant) -> Result<()>;

    async fn update(&self, tenant: &Tenant) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>>;

    /// Tenant by id, only if it is active
    async fn find_active_by_id(&self, id: &str) -> Result<Option<Tenant>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// Exact match on the primary domain among active tenants
    async fn find_active_by_primary_domain(&self, domain: &str) -> Result<Option<Tenant>>;

    /// Any active tenant, in storage order
    async fn find_first_active(&self) -> Result<Option<Tenant>>;

    async fn find_active(&self) -> Result<Vec<Tenant>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;

    async fn update(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Detach every user from `agency_id`; returns how many were updated
    async fn clear_agency(&self, agency_id: &str) -> Result<u64>;
}

#[async_trait]
pub trait AgencyStore: Send + Sync {
    async fn insert(&self, agency: &Agency) -> Result<()>;

    async fn update(&self, agency: &Agency) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Agency>>;

    async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<Agency>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn insert(&self, property: &Property) -> Result<()>;

    async fn update(&self, property: &Property) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Property>>;

    async fn find_published_by_agency(&self, agency_id: &str) -> Result<Vec<Property>>;

    async fn delete_by_agency(&self, agency_id: &str) -> Result<u64>;
}

/// Revoked refresh tokens, keyed by `jti`
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Record `jti` as revoked. False when it already was, so concurrent
    /// revocations of one token have a single winner.
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    async fn is_blacklisted(&self, jti: &str) -> Result<bool>;
}

/// True when a MongoDB write failed on a unique index
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}
