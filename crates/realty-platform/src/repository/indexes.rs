//! Index bootstrap for the MongoDB collections.

use std::time::Duration;

use mongodb::{bson::doc, bson::Document, options::IndexOptions, Database, IndexModel};
use tracing::info;

use crate::error::Result;

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

/// Create every index the repositories rely on. Idempotent.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let tenants = db.collection::<Document>("tenants");
    tenants
        .create_indexes([
            unique(doc! { "slug": 1 }),
            unique(doc! { "domain": 1 }),
            plain(doc! { "domain": 1, "isActive": 1 }),
        ])
        .await?;

    let users = db.collection::<Document>("users");
    users
        .create_indexes([unique(doc! { "email": 1 }), plain(doc! { "agencyId": 1 })])
        .await?;

    let agencies = db.collection::<Document>("agencies");
    agencies
        .create_indexes([unique(doc! { "tenantId": 1 }), unique(doc! { "slug": 1 })])
        .await?;

    let properties = db.collection::<Document>("properties");
    properties
        .create_indexes([
            unique(doc! { "reference": 1 }),
            plain(doc! { "agencyId": 1, "isPublished": 1 }),
        ])
        .await?;

    let blacklist = db.collection::<Document>("token_blacklist");
    blacklist
        .create_index(
            IndexModel::builder()
                .keys(doc! { "expiresAt": 1 })
                .options(
                    IndexOptions::builder()
                        .expire_after(Duration::from_secs(0))
                        .build(),
                )
                .build(),
        )
        .await?;

    info!("MongoDB indexes ensured");
    Ok(())
}
