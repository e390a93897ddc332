//! Token Store
//!
//! Single-use opaque tokens kept in the cache layer as `<purpose>:<token>`
//! -> user id. Unlike tenant caching there is no fallback here: if the
//! backend is down the operation fails.

use std::sync::Arc;
use std::time::Duration;

use realty_common::{cache_key, random_string};

use crate::cache::KeyValueCache;
use crate::error::Result;

pub const TOKEN_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    pub fn ttl(&self) -> Duration {
        match self {
            Self::EmailVerification => Duration::from_secs(24 * 60 * 60),
            Self::PasswordReset => Duration::from_secs(60 * 60),
        }
    }
}

pub struct TokenStore {
    cache: Arc<dyn KeyValueCache>,
}

impl TokenStore {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    pub fn key(purpose: TokenPurpose, token: &str) -> String {
        cache_key(purpose.prefix(), &[token])
    }

    /// Generate a fresh token bound to `user_id`. Earlier tokens stay valid.
    pub async fn issue(&self, purpose: TokenPurpose, user_id: &str) -> Result<String> {
        let token = random_string(TOKEN_LENGTH);
        self.cache
            .set(&Self::key(purpose, &token), user_id, purpose.ttl())
            .await?;
        Ok(token)
    }

    /// User id the token maps to; `None` when expired or never issued.
    pub async fn lookup(&self, purpose: TokenPurpose, token: &str) -> Result<Option<String>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.cache.get(&Self::key(purpose, token)).await?)
    }

    /// Remove the token and return its user id. Only one caller can
    /// consume a given token.
    pub async fn consume(&self, purpose: TokenPurpose, token: &str) -> Result<Option<String>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.cache.take(&Self::key(purpose, token)).await?)
    }
}
