//! OpenAPI Documentation
//!
//! Central OpenAPI specification for the platform APIs.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `bearer_auth` scheme referenced by protected endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::accounts::register,
        super::accounts::verify_email,
        super::accounts::resend_verification,
        super::accounts::login,
        super::accounts::social_auth,
        super::accounts::password_reset_request,
        super::accounts::password_reset_verify,
        super::accounts::password_reset_confirm,
        super::accounts::refresh_token,
        super::accounts::logout,
        super::accounts::get_profile,
        super::accounts::update_profile,
        super::accounts::change_password,
    ),
    components(
        schemas(
            super::accounts::RegisterRequest,
            super::accounts::RegisterResponse,
            super::accounts::LoginRequest,
            super::accounts::LoginResponse,
            super::accounts::TokenRequest,
            super::accounts::EmailRequest,
            super::accounts::VerifyEmailResponse,
            super::accounts::SocialAuthRequest,
            super::accounts::SocialAuthResponse,
            super::accounts::PasswordResetConfirmRequest,
            super::accounts::RefreshRequest,
            super::accounts::UserResponse,
            super::accounts::UpdateProfileRequest,
            super::accounts::ProfileUpdatedResponse,
            super::accounts::ChangePasswordRequest,
            crate::service::SessionTokens,
            crate::service::SocialProvider,
        )
    )
)]
pub struct AccountsApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::properties::list_properties,
        super::properties::featured_properties,
        super::properties::get_property,
    ),
    components(
        schemas(
            super::properties::PropertySummary,
            super::properties::PropertyDetail,
            crate::domain::ListingType,
            crate::domain::PropertyStatus,
            crate::domain::PropertyType,
            crate::domain::PropertyMedia,
            crate::domain::Amenity,
            crate::domain::Location,
        )
    )
)]
pub struct PropertiesApiDoc;

/// Platform API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Realty Platform API",
        version = "1.0.0",
        description = "Accounts and property catalog APIs. Every request is bound to the tenant serving its Host."
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development")
    ),
    tags(
        (name = "accounts", description = "Registration, login, password reset and profile"),
        (name = "properties", description = "Published property listings")
    ),
    nest(
        (path = "/api/v1/accounts", api = AccountsApiDoc),
        (path = "/api/v1", api = PropertiesApiDoc)
    ),
    components(
        schemas(
            crate::error::ErrorEnvelope,
            super::common::MessageResponse,
            super::common::PaginationParams,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct PlatformApiDoc;
