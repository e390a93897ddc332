//! Auth Service
//!
//! Registration, email verification, password login and reset, social
//! sign-in, session refresh/logout and profile maintenance.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{error, info, warn};

use super::notification::Notifier;
use super::password::PasswordService;
use super::session::{SessionTokenService, SessionTokens};
use super::social::{SocialAuthService, SocialProvider};
use super::token_store::{TokenPurpose, TokenStore};
use crate::domain::{normalize_email, User};
use crate::error::{FieldErrors, PlatformError, Result};
use crate::repository::UserStore;

const PASSWORD_MISMATCH: &str = "Password fields didn't match.";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Password sign-up request
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial profile change; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Outcome of a social sign-in
#[derive(Debug, Clone)]
pub struct SocialLogin {
    pub user: User,
    pub tokens: SessionTokens,
    pub created: bool,
}

fn add_error(fields: &mut FieldErrors, field: &str, message: impl Into<String>) {
    fields.entry(field.to_string()).or_default().push(message.into());
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenStore,
    sessions: Arc<SessionTokenService>,
    passwords: Arc<PasswordService>,
    social: Arc<SocialAuthService>,
    notifier: Arc<dyn Notifier>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenStore,
        sessions: Arc<SessionTokenService>,
        passwords: Arc<PasswordService>,
        social: Arc<SocialAuthService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            tokens,
            sessions,
            passwords,
            social,
            notifier,
        }
    }

    pub fn sessions(&self) -> &SessionTokenService {
        &self.sessions
    }

    // ------------------------------------------------------------------
    // Registration and verification
    // ------------------------------------------------------------------

    /// Create an inactive account and send its verification email.
    ///
    /// Re-registering an address that is still unverified re-sends the
    /// verification email for the existing account instead of creating a
    /// second one.
    pub async fn register_user(&self, registration: Registration) -> Result<User> {
        let email = normalize_email(&registration.email);
        let mut fields = FieldErrors::new();

        if !is_valid_email(&email) {
            add_error(&mut fields, "email", "Enter a valid email address.");
        }
        let existing = self.users.find_by_email(&email).await?;
        if existing.as_ref().is_some_and(|u| u.is_active) {
            warn!(email = %email, "Registration for an already active account");
            add_error(&mut fields, "email", "A user with this email already exists.");
        }
        for problem in self.passwords.policy().check(&registration.password, Some(&email)) {
            add_error(&mut fields, "password", problem);
        }
        if registration.password != registration.password_confirm {
            add_error(&mut fields, "password", PASSWORD_MISMATCH);
        }
        if !fields.is_empty() {
            return Err(PlatformError::InvalidFields { fields });
        }

        if let Some(user) = existing {
            info!(user_id = %user.id, "Unverified account re-registered, resending verification");
            self.send_verification(&user).await?;
            return Ok(user);
        }

        let hash = self.passwords.hash(&registration.password)?;
        let user = User::new(&email)
            .with_name(registration.first_name.trim(), registration.last_name.trim())
            .with_password_hash(hash);
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "User registered");

        let user = self.assign_default_permissions(user).await;
        self.send_verification(&user).await?;
        Ok(user)
    }

    /// Grant the default permissions to a freshly created user. A failure
    /// is logged and leaves the account in place.
    async fn assign_default_permissions(&self, mut user: User) -> User {
        user.grant_default_permissions();
        if let Err(e) = self.users.update(&user).await {
            error!(user_id = %user.id, "Failed to assign default permissions: {}", e);
        }
        user
    }

    pub async fn generate_verification_token(&self, user: &User) -> Result<String> {
        self.tokens.issue(TokenPurpose::EmailVerification, &user.id).await
    }

    async fn send_verification(&self, user: &User) -> Result<()> {
        let token = self.generate_verification_token(user).await?;
        self.notifier.send_verification(user, &token);
        Ok(())
    }

    /// Activate the account behind `token` and open a session. The token
    /// is consumed up front, so concurrent calls with it have one winner.
    pub async fn verify_email(&self, token: &str) -> Result<(User, SessionTokens)> {
        let user_id = self
            .tokens
            .consume(TokenPurpose::EmailVerification, token)
            .await?
            .ok_or_else(|| PlatformError::invalid_token("Invalid or expired verification token"))?;

        let mut user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(PlatformError::UserNotFound)?;

        user.activate();
        self.users.update(&user).await?;
        info!(user_id = %user.id, "Email verified");

        let tokens = self.sessions.issue_pair(&user)?;
        Ok((user, tokens))
    }

    /// Issue another verification token. Earlier tokens stay valid.
    pub async fn resend_verification_email(&self, email: &str) -> Result<()> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(PlatformError::UserNotFound)?;

        if user.is_active {
            return Err(PlatformError::validation("Email is already verified"));
        }
        self.send_verification(&user).await
    }

    // ------------------------------------------------------------------
    // Login and sessions
    // ------------------------------------------------------------------

    /// Unknown email and wrong password fail identically.
    pub async fn login_user(&self, email: &str, password: &str) -> Result<(User, SessionTokens)> {
        let Some(mut user) = self.users.find_by_email(&normalize_email(email)).await? else {
            self.passwords.verify_dummy(password);
            return Err(PlatformError::InvalidCredentials);
        };

        let matches = match user.password_hash.as_deref() {
            Some(hash) => self.passwords.verify(password, hash),
            None => self.passwords.verify_dummy(password),
        };
        if !matches {
            return Err(PlatformError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(PlatformError::EmailNotVerified);
        }

        user.record_login();
        self.users.update(&user).await?;
        info!(user_id = %user.id, "User logged in");

        let tokens = self.sessions.issue_pair(&user)?;
        Ok((user, tokens))
    }

    /// Rotate a refresh token: the old one is blacklisted and a new pair issued.
    pub async fn refresh_session(&self, refresh: &str) -> Result<SessionTokens> {
        let claims = self.sessions.validate_refresh(refresh).await?;
        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| PlatformError::invalid_token("Token is invalid or expired"))?;

        if !self.sessions.revoke(&claims).await? {
            return Err(PlatformError::invalid_token("Token is blacklisted"));
        }
        self.sessions.issue_pair(&user)
    }

    /// Blacklist a refresh token belonging to `user`.
    pub async fn logout(&self, user: &User, refresh: &str) -> Result<()> {
        let rejected = || PlatformError::validation("Invalid or expired refresh token");

        let claims = match self.sessions.validate_refresh(refresh).await {
            Ok(claims) => claims,
            Err(PlatformError::InvalidToken { .. }) => return Err(rejected()),
            Err(e) => return Err(e),
        };
        if claims.sub != user.id {
            return Err(rejected());
        }

        if !self.sessions.revoke(&claims).await? {
            return Err(rejected());
        }
        info!(user_id = %user.id, "User logged out");
        Ok(())
    }

    /// Active user behind an access token.
    pub async fn authenticate(&self, access: &str) -> Result<User> {
        let claims = self.sessions.validate_access(access)?;
        self.users
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| PlatformError::unauthorized("User not found or inactive"))
    }

    // ------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------

    /// Send a reset link. Unknown addresses are accepted silently; inactive
    /// accounts are told to verify first.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        if !user.is_active {
            return Err(PlatformError::validation("Please verify your email first"));
        }

        let token = self.tokens.issue(TokenPurpose::PasswordReset, &user.id).await?;
        self.notifier.send_password_reset(&user, &token);
        info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// User a reset token belongs to, without consuming it.
    pub async fn verify_reset_token(&self, token: &str) -> Result<User> {
        let user_id = self
            .tokens
            .lookup(TokenPurpose::PasswordReset, token)
            .await?
            .ok_or_else(|| PlatformError::invalid_token("Invalid or expired reset token"))?;

        self.users
            .find_by_id(&user_id)
            .await?
            .ok_or(PlatformError::UserNotFound)
    }

    pub async fn reset_password(&self, token: &str, password: &str, password_confirm: &str) -> Result<User> {
        if password != password_confirm {
            return Err(PlatformError::field("password", PASSWORD_MISMATCH));
        }

        let mut user = self.verify_reset_token(token).await?;
        self.passwords.validate("password", password, Some(&user.email))?;

        let hash = self.passwords.hash(password)?;
        let consumed = self.tokens.consume(TokenPurpose::PasswordReset, token).await?;
        if consumed.as_deref() != Some(user.id.as_str()) {
            return Err(PlatformError::invalid_token("Invalid or expired reset token"));
        }

        user.set_password_hash(hash);
        self.users.update(&user).await?;
        info!(user_id = %user.id, "Password reset");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Social sign-in
    // ------------------------------------------------------------------

    /// Exchange a provider access token for a local session. New users are
    /// created active; an existing account is used as it is.
    pub async fn social_login(&self, provider: SocialProvider, access_token: &str) -> Result<SocialLogin> {
        let profile = self.social.verify_token(provider, access_token).await?;
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .ok_or_else(|| PlatformError::validation("Email not provided by provider"))?;

        let (user, created) = match self.users.find_by_email(&email).await? {
            Some(user) => (user, false),
            None => {
                let user = User::new(&email)
                    .with_name(profile.first_name(), "")
                    .active();
                self.users.insert(&user).await?;
                info!(user_id = %user.id, provider = %provider, "User created from social sign-in");
                (self.assign_default_permissions(user).await, true)
            }
        };

        let tokens = self.sessions.issue_pair(&user)?;
        Ok(SocialLogin { user, tokens, created })
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    pub async fn update_profile(&self, user: &User, update: ProfileUpdate) -> Result<User> {
        let mut user = user.clone();
        if let Some(first_name) = update.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name.trim().to_string();
        }
        user.updated_at = chrono::Utc::now();
        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<()> {
        let mut fields = FieldErrors::new();

        let old_matches = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.passwords.verify(old_password, hash));
        if !old_matches {
            add_error(&mut fields, "old_password", "Old password is incorrect.");
        }
        for problem in self.passwords.policy().check(new_password, Some(&user.email)) {
            add_error(&mut fields, "new_password", problem);
        }
        if new_password != new_password_confirm {
            add_error(&mut fields, "new_password", "New password fields didn't match.");
        }
        if !fields.is_empty() {
            return Err(PlatformError::InvalidFields { fields });
        }

        let mut user = user.clone();
        user.set_password_hash(self.passwords.hash(new_password)?);
        self.users.update(&user).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
