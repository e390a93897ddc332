//! Property Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use super::PropertyStore;
use crate::domain::Property;
use crate::error::Result;

pub struct PropertyRepository {
    collection: Collection<Property>,
}

impl PropertyRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("properties"),
        }
    }
}

#[async_trait]
impl PropertyStore for PropertyRepository {
    async fn insert(&self, property: &Property) -> Result<()> {
        self.collection.insert_one(property).await?;
        Ok(())
    }

    async fn update(&self, property: &Property) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &property.id }, property)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Property>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_published_by_agency(&self, agency_id: &str) -> Result<Vec<Property>> {
        let cursor = self
            .collection
            .find(doc! { "agencyId": agency_id, "isPublished": true })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_by_agency(&self, agency_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "agencyId": agency_id })
            .await?;
        Ok(result.deleted_count)
    }
}
