//! API Layer
//!
//! REST endpoints for the platform. Every router here is mounted behind
//! [`middleware::resolve_tenant`].

pub mod accounts;
pub mod common;
pub mod middleware;
pub mod openapi;
pub mod properties;

pub use common::*;
pub use middleware::{resolve_tenant, AppState, Authenticated, CurrentTenant, TENANT_ID_HEADER, TENANT_NAME_HEADER};
pub use openapi::PlatformApiDoc;

pub use accounts::{accounts_router, AccountsState};
pub use properties::{properties_router, PropertiesState};
