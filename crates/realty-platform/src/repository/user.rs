//! User Repository

use async_trait::async_trait;
use mongodb::{bson::doc, Collection, Database};

use super::{is_duplicate_key, UserStore};
use crate::domain::User;
use crate::error::{PlatformError, Result};

pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        self.collection.insert_one(user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                PlatformError::duplicate("User", "email", &user.email)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &user.id }, user)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn clear_agency(&self, agency_id: &str) -> Result<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "agencyId": agency_id },
                doc! { "$unset": { "agencyId": "" } },
            )
            .await?;
        Ok(result.modified_count)
    }
}
