//! Session Tokens
//!
//! HS256 access/refresh pairs. Revoked refresh tokens are recorded by `jti`
//! in the durable [`TokenBlacklist`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::domain::{new_id, User};
use crate::error::{PlatformError, Result};
use crate::repository::TokenBlacklist;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "realty".to_string(),
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub token_type: TokenType,
}

/// Access + refresh pair returned by every successful authentication
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionTokens {
    pub refresh: String,
    pub access: String,
}

pub struct SessionTokenService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl SessionTokenService {
    pub fn new(config: SessionConfig, blacklist: Arc<dyn TokenBlacklist>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
            blacklist,
        }
    }

    pub fn issue_pair(&self, user: &User) -> Result<SessionTokens> {
        Ok(SessionTokens {
            refresh: self.issue(user, TokenType::Refresh)?,
            access: self.issue(user, TokenType::Access)?,
        })
    }

    fn issue(&self, user: &User, token_type: TokenType) -> Result<String> {
        let ttl = match token_type {
            TokenType::Access => self.config.access_ttl,
            TokenType::Refresh => self.config.refresh_ttl,
        };
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.clone(),
            jti: new_id(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            iss: self.config.issuer.clone(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, issuer, expiry and token type.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Session token rejected: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => PlatformError::invalid_token("Token has expired"),
                    _ => PlatformError::invalid_token("Token is invalid or expired"),
                }
            })?;

        if claims.token_type != expected {
            return Err(PlatformError::invalid_token("Token has wrong type"));
        }
        Ok(claims)
    }

    pub fn validate_access(&self, token: &str) -> Result<SessionClaims> {
        self.validate(token, TokenType::Access)
    }

    /// Refresh claims that have not been revoked.
    pub async fn validate_refresh(&self, token: &str) -> Result<SessionClaims> {
        let claims = self.validate(token, TokenType::Refresh)?;
        if self.blacklist.is_blacklisted(&claims.jti).await? {
            return Err(PlatformError::invalid_token("Token is blacklisted"));
        }
        Ok(claims)
    }

    /// Record the token as revoked until it would have expired anyway.
    /// False when another caller revoked it first.
    pub async fn revoke(&self, claims: &SessionClaims) -> Result<bool> {
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);
        self.blacklist.blacklist(&claims.jti, expires_at).await
    }
}

/// Token part of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
