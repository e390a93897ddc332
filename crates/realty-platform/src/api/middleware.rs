//! API Middleware
//!
//! Tenant resolution for every request plus the extractors handlers use to
//! reach the resolved tenant and the authenticated user.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, header::HOST, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::domain::{Tenant, User};
use crate::error::PlatformError;
use crate::service::{extract_bearer_token, AuthService, TenantResolver};

pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const TENANT_NAME_HEADER: &str = "x-tenant-name";

/// Shared services reachable from request extensions
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
}

/// Tenant attached to the request by [`resolve_tenant`]
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Tenant);

/// Hostname the request was addressed to
fn request_host(request: &Request) -> String {
    let raw = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default();
    TenantResolver::normalize_host(raw)
}

/// Resolve the tenant for the request host, expose it to handlers and tag
/// the response with `X-Tenant-ID` / `X-Tenant-Name`.
pub async fn resolve_tenant(
    State(resolver): State<Arc<TenantResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request_host(&request);
    let tenant = match resolver.resolve(&host).await {
        Ok(tenant) => tenant,
        Err(e) => return e.into_response(),
    };
    debug!(host = %host, tenant_id = %tenant.id, "Request bound to tenant");

    let id = HeaderValue::from_str(&tenant.id).ok();
    let name = HeaderValue::from_str(&tenant.name).ok();
    request.extensions_mut().insert(CurrentTenant(tenant));

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Some(id) = id {
        headers.insert(TENANT_ID_HEADER, id);
    }
    if let Some(name) = name {
        headers.insert(TENANT_NAME_HEADER, name);
    }
    response
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentTenant>()
            .cloned()
            .ok_or_else(|| PlatformError::internal("Tenant was not resolved for this request"))
    }
}

/// Extractor for authenticated requests: a valid access token belonging
/// to an active user
pub struct Authenticated(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PlatformError::unauthorized("Authentication credentials were not provided."))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| PlatformError::unauthorized("Invalid Authorization header format"))?;

        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| PlatformError::internal("AppState not found"))?;

        let user = app_state.auth_service.authenticate(token).await?;
        Ok(Authenticated(user))
    }
}
