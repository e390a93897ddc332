//! Tenant administration
//!
//! Creation with hostname and uniqueness checks, activation toggles and a
//! cascading delete (agency, its listings, and the users' agency link).

use std::sync::Arc;

use tracing::info;

use crate::domain::{slugify, Tenant};
use crate::error::{PlatformError, Result};
use crate::repository::{AgencyStore, PropertyStore, TenantDirectory, UserStore};

/// Input for [`TenantService::create_tenant`]
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub domain: String,
    pub slug: Option<String>,
    pub additional_domains: Vec<String>,
    pub is_active: bool,
}

impl NewTenant {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            slug: None,
            additional_domains: Vec::new(),
            is_active: true,
        }
    }
}

pub struct TenantService {
    directory: Arc<dyn TenantDirectory>,
    agencies: Arc<dyn AgencyStore>,
    properties: Arc<dyn PropertyStore>,
    users: Arc<dyn UserStore>,
}

impl TenantService {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        agencies: Arc<dyn AgencyStore>,
        properties: Arc<dyn PropertyStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            directory,
            agencies,
            properties,
            users,
        }
    }

    pub async fn create_tenant(&self, request: NewTenant) -> Result<Tenant> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(PlatformError::field("name", "This field may not be blank."));
        }

        let slug = match request.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slugify(name),
        };
        if slug.is_empty() {
            return Err(PlatformError::field("slug", "Could not derive a slug from the name."));
        }

        let mut tenant = Tenant::new(name, request.domain)
            .with_slug(slug)
            .with_additional_domains(request.additional_domains);
        if !request.is_active {
            tenant = tenant.inactive();
        }

        for domain in tenant.all_domains() {
            if !Tenant::is_valid_domain(domain) {
                return Err(PlatformError::field("domain", format!("Invalid domain: {}", domain)));
            }
        }

        if self.directory.find_by_slug(&tenant.slug).await?.is_some() {
            return Err(PlatformError::duplicate("Tenant", "slug", &tenant.slug));
        }
        let active = self.directory.find_active().await?;
        for domain in tenant.all_domains() {
            if active.iter().any(|t| t.serves_domain(domain)) {
                return Err(PlatformError::duplicate("Tenant", "domain", domain));
            }
        }

        self.directory.insert(&tenant).await?;
        info!(tenant_id = %tenant.id, domain = %tenant.domain, "Tenant created");
        Ok(tenant)
    }

    async fn load(&self, id: &str) -> Result<Tenant> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Tenant", id))
    }

    /// Reactivation fails while another active tenant serves one of its domains.
    pub async fn activate_tenant(&self, id: &str) -> Result<Tenant> {
        let mut tenant = self.load(id).await?;
        let others: Vec<Tenant> = self
            .directory
            .find_active()
            .await?
            .into_iter()
            .filter(|t| t.id != tenant.id)
            .collect();
        for domain in tenant.all_domains() {
            if others.iter().any(|t| t.serves_domain(domain)) {
                return Err(PlatformError::duplicate("Tenant", "domain", domain));
            }
        }

        tenant.activate();
        self.directory.update(&tenant).await?;
        info!(tenant_id = %tenant.id, "Tenant activated");
        Ok(tenant)
    }

    pub async fn deactivate_tenant(&self, id: &str) -> Result<Tenant> {
        let mut tenant = self.load(id).await?;
        tenant.deactivate();
        self.directory.update(&tenant).await?;
        info!(tenant_id = %tenant.id, "Tenant deactivated");
        Ok(tenant)
    }

    pub async fn delete_tenant(&self, id: &str) -> Result<()> {
        let tenant = self.load(id).await?;

        if let Some(agency) = self.agencies.find_by_tenant(&tenant.id).await? {
            let removed = self.properties.delete_by_agency(&agency.id).await?;
            let detached = self.users.clear_agency(&agency.id).await?;
            self.agencies.delete(&agency.id).await?;
            info!(
                agency_id = %agency.id,
                properties = removed,
                users = detached,
                "Agency removed with tenant"
            );
        }

        self.directory.delete(&tenant.id).await?;
        info!(tenant_id = %tenant.id, "Tenant deleted");
        Ok(())
    }
}
