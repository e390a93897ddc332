//! Platform Error Types
//!
//! Every failure that can leave the platform, plus the JSON envelope it is
//! rendered into: `{error: true, status_code, message, details}`.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::cache::CacheError;

/// Field name -> list of problems with that field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate entity: {entity_type} with {field}={value}")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Validation error")]
    InvalidFields { fields: FieldErrors },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email first")]
    EmailNotVerified,

    #[error("{message}")]
    InvalidToken { message: String },

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to verify {provider} token: {message}")]
    SocialAuth { provider: String, message: String },

    #[error("No tenant registered for domain: {domain}")]
    TenantNotFound { domain: String },

    #[error("Development tenant not configured")]
    DevelopmentTenantMissing,

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Single field-level validation error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::InvalidFields { fields }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidFields { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. }
            | Self::InvalidCredentials
            | Self::EmailNotVerified
            | Self::InvalidToken { .. }
            | Self::SocialAuth { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } | Self::UserNotFound | Self::TenantNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::Cache(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DevelopmentTenantMissing
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Public message; storage internals are not echoed back to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Serialization(_) | Self::Deserialization(_) | Self::Internal { .. } => {
                "Internal server error".to_string()
            }
            Self::Cache(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let status = self.status_code();
        let message = self.public_message();
        let details = match self {
            Self::InvalidFields { fields } => serde_json::json!(fields),
            Self::DevelopmentTenantMissing => serde_json::json!({
                "detail": "Please create a tenant with domain \"localhost\" for local development"
            }),
            _ => serde_json::json!({ "detail": message }),
        };

        ErrorEnvelope {
            error: true,
            status_code: status.as_u16(),
            message,
            details,
        }
    }
}

impl From<JsonRejection> for PlatformError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for PlatformError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// Failure envelope carried by every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: bool,
    pub status_code: u16,
    pub message: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else if status != StatusCode::NOT_FOUND {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(self.envelope())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
