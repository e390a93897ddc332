//! Accounts API Endpoints
//!
//! - POST /register, /verify-email, /resend-verification
//! - POST /login, /social-auth, /token/refresh, /logout
//! - POST /password-reset/{request,verify,confirm}
//! - GET/PUT/PATCH /profile, POST /profile/change-password

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::common::{MessageResponse, ValidJson};
use crate::api::middleware::{AppState, Authenticated};
use crate::domain::User;
use crate::error::PlatformError;
use crate::service::{AuthService, ProfileUpdate, Registration, SessionTokens, SocialProvider};

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub tokens: SessionTokens,
}

/// Single-use token from an email link
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub tokens: SessionTokens,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SocialAuthRequest {
    pub provider: SocialProvider,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SocialAuthResponse {
    pub user: UserResponse,
    pub tokens: SessionTokens,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Public view of an account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdatedResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Accounts service state
#[derive(Clone)]
pub struct AccountsState {
    pub auth_service: Arc<AuthService>,
}

/// Register a new account
///
/// Creates an inactive account and emails a verification link. Registering
/// an address that is still unverified re-sends the link.
#[utoipa::path(
    post,
    path = "/register",
    tag = "accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration accepted", body = RegisterResponse),
        (status = 400, description = "Validation error", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn register(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), PlatformError> {
    let user = state
        .auth_service
        .register_user(Registration {
            email: req.email,
            password: req.password,
            password_confirm: req.password_confirm,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email to verify your account.".to_string(),
            email: user.email,
        }),
    ))
}

/// Verify an email address
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = "accounts",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 401, description = "Invalid or expired token", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn verify_email(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<TokenRequest>,
) -> Result<Json<VerifyEmailResponse>, PlatformError> {
    let (_, tokens) = state.auth_service.verify_email(&req.token).await?;
    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        tokens,
    }))
}

/// Resend the verification email
#[utoipa::path(
    post,
    path = "/resend-verification",
    tag = "accounts",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 400, description = "Already verified", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Unknown email", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn resend_verification(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state.auth_service.resend_verification_email(&req.email).await?;
    Ok(Json(MessageResponse::new("Verification email sent successfully")))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or unverified email", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn login(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, PlatformError> {
    let (_, tokens) = state.auth_service.login_user(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { tokens }))
}

/// Sign in with a social provider access token
#[utoipa::path(
    post,
    path = "/social-auth",
    tag = "accounts",
    request_body = SocialAuthRequest,
    responses(
        (status = 200, description = "Signed in", body = SocialAuthResponse),
        (status = 400, description = "Provider did not return an email", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Provider rejected the token", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn social_auth(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<SocialAuthRequest>,
) -> Result<Json<SocialAuthResponse>, PlatformError> {
    let login = state
        .auth_service
        .social_login(req.provider, &req.access_token)
        .await?;
    Ok(Json(SocialAuthResponse {
        user: UserResponse::from(&login.user),
        tokens: login.tokens,
    }))
}

/// Request a password reset link
///
/// Always answers the same way for unknown addresses.
#[utoipa::path(
    post,
    path = "/password-reset/request",
    tag = "accounts",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, description = "Email not verified", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn password_reset_request(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state.auth_service.request_password_reset(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "If the email exists, a password reset link has been sent.",
    )))
}

/// Check a password reset token without using it
#[utoipa::path(
    post,
    path = "/password-reset/verify",
    tag = "accounts",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn password_reset_verify(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<TokenRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state.auth_service.verify_reset_token(&req.token).await?;
    Ok(Json(MessageResponse::new("Token is valid")))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/password-reset/confirm",
    tag = "accounts",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation error", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Invalid or expired token", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn password_reset_confirm(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state
        .auth_service
        .reset_password(&req.token, &req.password, &req.password_confirm)
        .await?;
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// Rotate a refresh token
///
/// The presented refresh token is blacklisted and a new pair returned.
#[utoipa::path(
    post,
    path = "/token/refresh",
    tag = "accounts",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = SessionTokens),
        (status = 401, description = "Invalid, expired or blacklisted token", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn refresh_token(
    State(state): State<AccountsState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> Result<Json<SessionTokens>, PlatformError> {
    let tokens = state.auth_service.refresh_session(&req.refresh).await?;
    Ok(Json(tokens))
}

/// Logout by blacklisting a refresh token
#[utoipa::path(
    post,
    path = "/logout",
    tag = "accounts",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Invalid or expired refresh token", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AccountsState>,
    Authenticated(user): Authenticated,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state.auth_service.logout(&user, &req.refresh).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/profile",
    tag = "accounts",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(Authenticated(user): Authenticated) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Update first and last name
///
/// PUT and PATCH both apply a partial update.
#[utoipa::path(
    put,
    path = "/profile",
    tag = "accounts",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdatedResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AccountsState>,
    Authenticated(user): Authenticated,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdatedResponse>, PlatformError> {
    let user = state
        .auth_service
        .update_profile(
            &user,
            ProfileUpdate {
                first_name: req.first_name,
                last_name: req.last_name,
            },
        )
        .await?;
    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated successfully".to_string(),
        user: UserResponse::from(&user),
    }))
}

/// Change the password of the current user
#[utoipa::path(
    post,
    path = "/profile/change-password",
    tag = "accounts",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AccountsState>,
    Authenticated(user): Authenticated,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    state
        .auth_service
        .change_password(&user, &req.old_password, &req.new_password, &req.new_password_confirm)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Create the accounts router
pub fn accounts_router(state: AccountsState) -> Router {
    let app_state = AppState {
        auth_service: state.auth_service.clone(),
    };
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/social-auth", post(social_auth))
        .route("/password-reset/request", post(password_reset_request))
        .route("/password-reset/verify", post(password_reset_verify))
        .route("/password-reset/confirm", post(password_reset_confirm))
        .route("/token/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile).patch(update_profile))
        .route("/profile/change-password", post(change_password))
        .layer(Extension(app_state))
        .with_state(state)
}
