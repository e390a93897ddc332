//! Service Layer
//!
//! Business logic for the platform: tenant resolution and administration,
//! account flows, session tokens, notifications and the property catalog.

pub mod auth;
pub mod catalog;
pub mod notification;
pub mod password;
pub mod session;
pub mod social;
pub mod tenant;
pub mod tenant_resolver;
pub mod token_store;

pub use auth::{AuthService, ProfileUpdate, Registration, SocialLogin};
pub use catalog::{CatalogService, ListingPage, PropertyFilter, PropertyOrdering, SortField};
pub use notification::{
    EmailMessage, HttpMailer, LogMailer, MailError, Mailer, NotificationConfig,
    NotificationDispatcher, Notifier,
};
pub use password::{PasswordPolicy, PasswordService};
pub use session::{
    extract_bearer_token, SessionClaims, SessionConfig, SessionTokenService, SessionTokens, TokenType,
};
pub use social::{ProviderSpec, SocialAuthService, SocialProfile, SocialProvider};
pub use tenant::{NewTenant, TenantService};
pub use tenant_resolver::{TenantResolver, TenantResolverConfig, DEFAULT_DEVELOPMENT_HOSTS};
pub use token_store::{TokenPurpose, TokenStore, TOKEN_LENGTH};
