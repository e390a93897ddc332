//! Tenant Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use super::{is_duplicate_key, TenantDirectory};
use crate::domain::Tenant;
use crate::error::{PlatformError, Result};

pub struct TenantRepository {
    collection: Collection<Tenant>,
}

impl TenantRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("tenants"),
        }
    }
}

#[async_trait]
impl TenantDirectory for TenantRepository {
    async fn insert(&self, tenant: &Tenant) -> Result<()> {
        self.collection.insert_one(tenant).await.map_err(|e| {
            if is_duplicate_key(&e) {
                PlatformError::duplicate("Tenant", "domain", &tenant.domain)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &tenant.id }, tenant)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_active_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": id, "isActive": true })
            .await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    async fn find_active_by_primary_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        Ok(self
            .collection
            .find_one(doc! { "domain": domain, "isActive": true })
            .await?)
    }

    async fn find_first_active(&self) -> Result<Option<Tenant>> {
        Ok(self.collection.find_one(doc! { "isActive": true }).await?)
    }

    async fn find_active(&self) -> Result<Vec<Tenant>> {
        let cursor = self.collection.find(doc! { "isActive": true }).await?;
        Ok(cursor.try_collect().await?)
    }
}
