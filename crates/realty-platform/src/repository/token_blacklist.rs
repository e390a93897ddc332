//! Refresh-token blacklist
//!
//! Entries carry a BSON date so the TTL index drops them once the token
//! would have expired anyway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Document},
    Collection, Database,
};

use super::{is_duplicate_key, TokenBlacklist};
use crate::error::Result;

pub struct TokenBlacklistRepository {
    collection: Collection<Document>,
}

impl TokenBlacklistRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("token_blacklist"),
        }
    }
}

#[async_trait]
impl TokenBlacklist for TokenBlacklistRepository {
    async fn blacklist(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let entry = doc! {
            "_id": jti,
            "expiresAt": bson::DateTime::from_chrono(expires_at),
            "blacklistedAt": bson::DateTime::now(),
        };
        match self.collection.insert_one(entry).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool> {
        let count = self
            .collection
            .count_documents(doc! { "_id": jti })
            .await?;
        Ok(count > 0)
    }
}
