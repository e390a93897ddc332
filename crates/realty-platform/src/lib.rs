//! Realty Platform
//!
//! Multi-tenant real-estate backend:
//! - Tenant resolution by request host, with a cached domain lookup
//! - Account registration, email verification and password reset
//! - Password, social-provider and refresh-token sessions
//! - Read-only property catalog scoped to the resolved tenant

pub mod api;
pub mod cache;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;

pub use domain::*;
pub use error::{PlatformError, Result};
