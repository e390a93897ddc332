//! Property listing entities

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Draft,
    Active,
    Sold,
    Rented,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
    Exchange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PropertyType {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl PropertyType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            slug: super::slugify(&name),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Amenity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PropertyMedia {
    pub id: String,
    pub image_url: String,
    pub order: u16,
    pub is_cover: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: String,

    pub agency_id: String,

    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,

    pub listing_type: ListingType,
    #[serde(default)]
    pub status: PropertyStatus,

    pub price: Decimal,
    #[serde(default)]
    pub negotiable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_from: Option<NaiveDate>,

    pub wilaya: Location,
    pub commune: Location,
    #[serde(default)]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Decimal>,

    pub area_m2: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,

    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub parking: bool,

    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,

    /// `<agency id>-<6 upper-case hex chars>`, assigned once
    pub reference: String,

    #[serde(default)]
    pub views_count: u32,
    #[serde(default)]
    pub leads_count: u32,

    /// Ordered by `order`, at most one cover
    #[serde(default)]
    pub media: Vec<PropertyMedia>,

    #[serde(default)]
    pub amenities: Vec<Amenity>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn new(
        agency_id: impl Into<String>,
        title: impl Into<String>,
        listing_type: ListingType,
        price: Decimal,
        wilaya: Location,
        commune: Location,
        area_m2: u32,
    ) -> Self {
        let agency_id = agency_id.into();
        let title = title.into();
        let now = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        Self {
            id: super::new_id(),
            reference: format!("{}-{}", agency_id, suffix),
            agency_id,
            slug: super::slugify(&title),
            title,
            description: String::new(),
            property_type: None,
            listing_type,
            status: PropertyStatus::Draft,
            price,
            negotiable: false,
            available_from: None,
            wilaya,
            commune,
            address: String::new(),
            latitude: None,
            longitude: None,
            area_m2,
            bedrooms: None,
            bathrooms: None,
            floor: None,
            furnished: false,
            parking: false,
            is_published: true,
            is_featured: false,
            views_count: 0,
            leads_count: 0,
            media: Vec::new(),
            amenities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn publish(&mut self) {
        self.status = PropertyStatus::Active;
        self.is_published = true;
        self.updated_at = Utc::now();
    }

    /// Insert media keeping `order`; a new cover replaces the previous one.
    pub fn add_media(&mut self, media: PropertyMedia) {
        if media.is_cover {
            for existing in &mut self.media {
                existing.is_cover = false;
            }
        }
        self.media.push(media);
        self.media.sort_by_key(|m| m.order);
    }

    pub fn cover_image(&self) -> Option<&PropertyMedia> {
        self.media.iter().find(|m| m.is_cover)
    }

    /// Attach an amenity once
    pub fn add_amenity(&mut self, amenity: Amenity) {
        if !self.amenities.iter().any(|a| a.id == amenity.id) {
            self.amenities.push(amenity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn property() -> Property {
        Property::new(
            "agency-1",
            "Bright F3 near the sea",
            ListingType::Sale,
            Decimal::from_str("12500000.00").unwrap(),
            Location::new("16", "Alger"),
            Location::new("1601", "Alger Centre"),
            95,
        )
    }

    fn media(id: &str, order: u16, cover: bool) -> PropertyMedia {
        PropertyMedia {
            id: id.to_string(),
            image_url: format!("https://img.test/{}.jpg", id),
            order,
            is_cover: cover,
        }
    }

    #[test]
    fn test_reference_format() {
        let p = property();
        let (agency, suffix) = p.reference.rsplit_once('-').unwrap();
        assert_eq!(agency, "agency-1");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(p.slug, "bright-f3-near-the-sea");
        assert_eq!(p.status, PropertyStatus::Draft);
    }

    #[test]
    fn test_publish() {
        let mut p = property();
        p.is_published = false;
        p.publish();
        assert_eq!(p.status, PropertyStatus::Active);
        assert!(p.is_published);
    }

    #[test]
    fn test_single_cover_and_ordering() {
        let mut p = property();
        p.add_media(media("b", 2, true));
        p.add_media(media("a", 1, false));
        p.add_media(media("c", 3, true));

        assert_eq!(p.media.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(p.media.iter().filter(|m| m.is_cover).count(), 1);
        assert_eq!(p.cover_image().unwrap().id, "c");
    }

    #[test]
    fn test_amenities_unique() {
        let mut p = property();
        let pool = Amenity { id: "1".into(), name: "Pool".into() };
        p.add_amenity(pool.clone());
        p.add_amenity(pool);
        assert_eq!(p.amenities.len(), 1);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&PropertyStatus::Rented).unwrap(), "\"rented\"");
        assert_eq!(serde_json::to_string(&ListingType::Exchange).unwrap(), "\"exchange\"");
    }
}
