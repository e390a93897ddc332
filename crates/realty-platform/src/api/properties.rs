//! Properties API Endpoints
//!
//! Read-only listing catalog of the tenant resolved for the request.
//! - GET /properties
//! - GET /properties/featured
//! - GET /properties/{id}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::common::{PaginatedResponse, PaginationParams, ValidQuery};
use crate::api::middleware::CurrentTenant;
use crate::domain::{
    Amenity, ListingType, Location, Property, PropertyMedia, PropertyStatus, PropertyType,
};
use crate::error::PlatformError;
use crate::service::{CatalogService, PropertyFilter, PropertyOrdering};

/// Listing filters, search, ordering and paging
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PropertyQuery {
    pub listing_type: Option<ListingType>,
    pub status: Option<PropertyStatus>,
    /// Property type id or slug
    pub property_type: Option<String>,
    /// Wilaya id
    pub wilaya: Option<String>,
    /// Commune id
    pub commune: Option<String>,
    #[param(value_type = Option<String>)]
    pub price_min: Option<Decimal>,
    #[param(value_type = Option<String>)]
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
    /// Matches title, description, address and reference
    pub search: Option<String>,
    /// `created_at`, `price`, `area_m2` or `views_count`, `-` for descending
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PropertyQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }

    fn ordering(&self) -> Result<PropertyOrdering, PlatformError> {
        match self.ordering.as_deref().filter(|o| !o.is_empty()) {
            Some(ordering) => ordering.parse(),
            None => Ok(PropertyOrdering::default()),
        }
    }

    fn filter(self) -> PropertyFilter {
        PropertyFilter {
            listing_type: self.listing_type,
            status: self.status,
            property_type: self.property_type,
            wilaya: self.wilaya,
            commune: self.commune,
            price_min: self.price_min,
            price_max: self.price_max,
            area_min: self.area_min,
            area_max: self.area_max,
            bedrooms: self.bedrooms,
            bedrooms_min: self.bedrooms_min,
            bathrooms: self.bathrooms,
            bathrooms_min: self.bathrooms_min,
            furnished: self.furnished,
            parking: self.parking,
            is_featured: self.is_featured,
            search: self.search,
        }
    }
}

/// Listing card
#[derive(Debug, Serialize, ToSchema)]
pub struct PropertySummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub listing_type: ListingType,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub negotiable: bool,
    pub property_type: Option<PropertyType>,
    pub wilaya: Location,
    pub commune: Location,
    pub address: String,
    pub area_m2: u32,
    pub bedrooms: Option<u16>,
    pub bathrooms: Option<u16>,
    pub floor: Option<i32>,
    pub furnished: bool,
    pub parking: bool,
    pub is_featured: bool,
    pub status: PropertyStatus,
    pub cover_image: Option<String>,
    pub agency_name: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl PropertySummary {
    fn new(property: Property, agency_name: &str) -> Self {
        Self {
            cover_image: property.cover_image().map(|m| m.image_url.clone()),
            agency_name: agency_name.to_string(),
            id: property.id,
            title: property.title,
            slug: property.slug,
            listing_type: property.listing_type,
            price: property.price,
            negotiable: property.negotiable,
            property_type: property.property_type,
            wilaya: property.wilaya,
            commune: property.commune,
            address: property.address,
            area_m2: property.area_m2,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            floor: property.floor,
            furnished: property.furnished,
            parking: property.parking,
            is_featured: property.is_featured,
            status: property.status,
            reference: property.reference,
            created_at: property.created_at,
        }
    }
}

/// Full listing
#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub reference: String,
    pub listing_type: ListingType,
    pub status: PropertyStatus,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub negotiable: bool,
    pub available_from: Option<NaiveDate>,
    pub property_type: Option<PropertyType>,
    pub wilaya: Location,
    pub commune: Location,
    pub address: String,
    #[schema(value_type = Option<String>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub longitude: Option<Decimal>,
    pub area_m2: u32,
    pub bedrooms: Option<u16>,
    pub bathrooms: Option<u16>,
    pub floor: Option<i32>,
    pub furnished: bool,
    pub parking: bool,
    pub is_published: bool,
    pub is_featured: bool,
    pub media: Vec<PropertyMedia>,
    pub amenities: Vec<Amenity>,
    pub agency_name: String,
    pub views_count: u32,
    pub leads_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyDetail {
    fn new(property: Property, agency_name: &str) -> Self {
        Self {
            id: property.id,
            title: property.title,
            description: property.description,
            slug: property.slug,
            reference: property.reference,
            listing_type: property.listing_type,
            status: property.status,
            price: property.price,
            negotiable: property.negotiable,
            available_from: property.available_from,
            property_type: property.property_type,
            wilaya: property.wilaya,
            commune: property.commune,
            address: property.address,
            latitude: property.latitude,
            longitude: property.longitude,
            area_m2: property.area_m2,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            floor: property.floor,
            furnished: property.furnished,
            parking: property.parking,
            is_published: property.is_published,
            is_featured: property.is_featured,
            media: property.media,
            amenities: property.amenities,
            agency_name: agency_name.to_string(),
            views_count: property.views_count,
            leads_count: property.leads_count,
            created_at: property.created_at,
            updated_at: property.updated_at,
        }
    }
}

/// Properties service state
#[derive(Clone)]
pub struct PropertiesState {
    pub catalog: Arc<CatalogService>,
}

async fn agency_name(state: &PropertiesState, tenant: &crate::domain::Tenant) -> Result<String, PlatformError> {
    Ok(state
        .catalog
        .agency_for(tenant)
        .await?
        .map(|a| a.name)
        .unwrap_or_default())
}

/// List published properties
#[utoipa::path(
    get,
    path = "/properties",
    tag = "properties",
    params(PropertyQuery),
    responses(
        (status = 200, description = "Page of listings", body = PaginatedResponse<PropertySummary>),
        (status = 400, description = "Invalid query", body = crate::error::ErrorEnvelope),
        (status = 404, description = "No tenant for domain", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_properties(
    State(state): State<PropertiesState>,
    CurrentTenant(tenant): CurrentTenant,
    ValidQuery(query): ValidQuery<PropertyQuery>,
) -> Result<Json<PaginatedResponse<PropertySummary>>, PlatformError> {
    let (page, limit) = query.pagination().normalized();
    let ordering = query.ordering()?;
    let filter = query.filter();

    let listing = state.catalog.list(&tenant, &filter, ordering, page, limit).await?;
    let agency = agency_name(&state, &tenant).await?;
    let data = listing
        .items
        .into_iter()
        .map(|p| PropertySummary::new(p, &agency))
        .collect();
    Ok(Json(PaginatedResponse::new(data, page, limit, listing.total)))
}

/// Featured active listings
#[utoipa::path(
    get,
    path = "/properties/featured",
    tag = "properties",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of featured listings", body = PaginatedResponse<PropertySummary>)
    )
)]
pub async fn featured_properties(
    State(state): State<PropertiesState>,
    CurrentTenant(tenant): CurrentTenant,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<PaginatedResponse<PropertySummary>>, PlatformError> {
    let (page, limit) = params.normalized();
    let listing = state.catalog.featured(&tenant, page, limit).await?;
    let agency = agency_name(&state, &tenant).await?;
    let data = listing
        .items
        .into_iter()
        .map(|p| PropertySummary::new(p, &agency))
        .collect();
    Ok(Json(PaginatedResponse::new(data, page, limit, listing.total)))
}

/// Property detail
#[utoipa::path(
    get,
    path = "/properties/{id}",
    tag = "properties",
    params(("id" = String, Path, description = "Property id")),
    responses(
        (status = 200, description = "Listing", body = PropertyDetail),
        (status = 404, description = "Not found", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_property(
    State(state): State<PropertiesState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<String>,
) -> Result<Json<PropertyDetail>, PlatformError> {
    let (property, agency) = state.catalog.get(&tenant, &id).await?;
    Ok(Json(PropertyDetail::new(property, &agency.name)))
}

/// Create the properties router
pub fn properties_router(state: PropertiesState) -> Router {
    Router::new()
        .route("/properties", get(list_properties))
        .route("/properties/featured", get(featured_properties))
        .route("/properties/:id", get(get_property))
        .with_state(state)
}
