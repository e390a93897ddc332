//! Agency Repository

use async_trait::async_trait;
use mongodb::{bson::doc, Collection, Database};

use super::{is_duplicate_key, AgencyStore};
use crate::domain::Agency;
use crate::error::{PlatformError, Result};

pub struct AgencyRepository {
    collection: Collection<Agency>,
}

impl AgencyRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("agencies"),
        }
    }
}

#[async_trait]
impl AgencyStore for AgencyRepository {
    async fn insert(&self, agency: &Agency) -> Result<()> {
        self.collection.insert_one(agency).await.map_err(|e| {
            if is_duplicate_key(&e) {
                PlatformError::duplicate("Agency", "tenantId", &agency.tenant_id)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn update(&self, agency: &Agency) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &agency.id }, agency)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Agency>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<Agency>> {
        Ok(self.collection.find_one(doc! { "tenantId": tenant_id }).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
