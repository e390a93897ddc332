//! Property catalog
//!
//! Read side of the listings: published properties of the tenant's agency,
//! filtered, searched, ordered and paged in memory.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{Agency, ListingType, Property, PropertyStatus, Tenant};
use crate::error::{PlatformError, Result};
use crate::repository::{AgencyStore, PropertyStore};

/// Exact-match and range filters; every `None` is ignored
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub listing_type: Option<ListingType>,
    pub status: Option<PropertyStatus>,
    /// Property type id or slug
    pub property_type: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub area_min: Option<u32>,
    pub area_max: Option<u32>,
    pub bedrooms: Option<u16>,
    pub bedrooms_min: Option<u16>,
    pub bathrooms: Option<u16>,
    pub bathrooms_min: Option<u16>,
    pub furnished: Option<bool>,
    pub parking: Option<bool>,
    pub is_featured: Option<bool>,
    /// Case-insensitive match on title, description, address and reference
    pub search: Option<String>,
}

fn at_least(value: Option<u16>, min: Option<u16>) -> bool {
    match min {
        Some(min) => value.is_some_and(|v| v >= min),
        None => true,
    }
}

fn equals<T: PartialEq>(value: Option<T>, expected: Option<T>) -> bool {
    match expected {
        Some(expected) => value == Some(expected),
        None => true,
    }
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        equals(Some(property.listing_type), self.listing_type)
            && equals(Some(property.status), self.status)
            && self.property_type.as_deref().map_or(true, |wanted| {
                property
                    .property_type
                    .as_ref()
                    .is_some_and(|t| t.id == wanted || t.slug == wanted)
            })
            && self.wilaya.as_deref().map_or(true, |w| property.wilaya.id == w)
            && self.commune.as_deref().map_or(true, |c| property.commune.id == c)
            && self.price_min.map_or(true, |min| property.price >= min)
            && self.price_max.map_or(true, |max| property.price <= max)
            && self.area_min.map_or(true, |min| property.area_m2 >= min)
            && self.area_max.map_or(true, |max| property.area_m2 <= max)
            && equals(property.bedrooms, self.bedrooms)
            && at_least(property.bedrooms, self.bedrooms_min)
            && equals(property.bathrooms, self.bathrooms)
            && at_least(property.bathrooms, self.bathrooms_min)
            && equals(Some(property.furnished), self.furnished)
            && equals(Some(property.parking), self.parking)
            && equals(Some(property.is_featured), self.is_featured)
            && self.matches_search(property)
    }

    fn matches_search(&self, property: &Property) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        [&property.title, &property.description, &property.address, &property.reference]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Price,
    Area,
    Views,
}

/// Sort field with direction, written `field` or `-field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyOrdering {
    pub field: SortField,
    pub descending: bool,
}

impl Default for PropertyOrdering {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for PropertyOrdering {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "created_at" => SortField::CreatedAt,
            "price" => SortField::Price,
            "area_m2" => SortField::Area,
            "views_count" => SortField::Views,
            other => {
                return Err(PlatformError::field(
                    "ordering",
                    format!("Unsupported ordering field: {}", other),
                ))
            }
        };
        Ok(Self { field, descending })
    }
}

impl PropertyOrdering {
    fn compare(&self, a: &Property, b: &Property) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Price => a.price.cmp(&b.price),
            SortField::Area => a.area_m2.cmp(&b.area_m2),
            SortField::Views => a.views_count.cmp(&b.views_count),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// One page of listings with the total match count
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub items: Vec<Property>,
    pub total: u64,
}

pub struct CatalogService {
    agencies: Arc<dyn AgencyStore>,
    properties: Arc<dyn PropertyStore>,
}

impl CatalogService {
    pub fn new(agencies: Arc<dyn AgencyStore>, properties: Arc<dyn PropertyStore>) -> Self {
        Self { agencies, properties }
    }

    /// The tenant's active agency, if it has one
    pub async fn agency_for(&self, tenant: &Tenant) -> Result<Option<Agency>> {
        Ok(self
            .agencies
            .find_by_tenant(&tenant.id)
            .await?
            .filter(|a| a.is_active))
    }

    async fn published(&self, tenant: &Tenant) -> Result<Vec<Property>> {
        match self.agency_for(tenant).await? {
            Some(agency) => self.properties.find_published_by_agency(&agency.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// `page` is 1-based; `limit` is clamped to at least 1.
    pub async fn list(
        &self,
        tenant: &Tenant,
        filter: &PropertyFilter,
        ordering: PropertyOrdering,
        page: u32,
        limit: u32,
    ) -> Result<ListingPage> {
        let mut matching: Vec<Property> = self
            .published(tenant)
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        matching.sort_by(|a, b| ordering.compare(a, b));

        let total = matching.len() as u64;
        let limit = limit.max(1) as usize;
        let offset = page.saturating_sub(1) as usize * limit;
        let items = matching.into_iter().skip(offset).take(limit).collect();
        Ok(ListingPage { items, total })
    }

    /// Featured, published and active listings, newest first
    pub async fn featured(&self, tenant: &Tenant, page: u32, limit: u32) -> Result<ListingPage> {
        let filter = PropertyFilter {
            is_featured: Some(true),
            status: Some(PropertyStatus::Active),
            ..Default::default()
        };
        self.list(tenant, &filter, PropertyOrdering::default(), page, limit).await
    }

    /// A published listing of this tenant; anything else is not found.
    pub async fn get(&self, tenant: &Tenant, id: &str) -> Result<(Property, Agency)> {
        let not_found = || PlatformError::not_found("Property", id);
        let agency = self.agency_for(tenant).await?.ok_or_else(not_found)?;
        let property = self
            .properties
            .find_by_id(id)
            .await?
            .filter(|p| p.is_published && p.agency_id == agency.id)
            .ok_or_else(not_found)?;
        Ok((property, agency))
    }
}
