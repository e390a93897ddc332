//! Platform Integration Tests
//!
//! End-to-end flows across the services, wired with the in-memory stores
//! the `memory` storage mode uses.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use realty_platform::cache::MemoryCache;
use realty_platform::repository::{
    InMemoryAgencyRepository, InMemoryPropertyRepository, InMemoryTenantDirectory,
    InMemoryTokenBlacklist, InMemoryUserRepository, TenantDirectory, UserStore,
};
use realty_platform::service::{
    AuthService, NewTenant, Notifier, PasswordService, Registration, SessionConfig,
    SessionTokenService, SocialAuthService, TenantResolver, TenantResolverConfig, TenantService,
    TokenStore,
};
use realty_platform::{PlatformError, Tenant, User};

#[derive(Default)]
struct RecordingNotifier {
    verifications: Mutex<Vec<(String, String)>>,
    resets: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn last_verification(&self) -> String {
        self.verifications.lock().last().map(|(_, t)| t.clone()).unwrap()
    }

    fn last_reset(&self) -> String {
        self.resets.lock().last().map(|(_, t)| t.clone()).unwrap()
    }
}

impl Notifier for RecordingNotifier {
    fn send_verification(&self, user: &User, token: &str) {
        self.verifications.lock().push((user.email.clone(), token.to_string()));
    }

    fn send_password_reset(&self, user: &User, token: &str) {
        self.resets.lock().push((user.email.clone(), token.to_string()));
    }
}

struct Accounts {
    auth: AuthService,
    users: Arc<InMemoryUserRepository>,
    notifier: Arc<RecordingNotifier>,
}

fn accounts() -> Accounts {
    accounts_with_social(SocialAuthService::new())
}

fn accounts_with_social(social: SocialAuthService) -> Accounts {
    let users = Arc::new(InMemoryUserRepository::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let auth = AuthService::new(
        users.clone(),
        TokenStore::new(Arc::new(MemoryCache::new())),
        Arc::new(SessionTokenService::new(
            SessionConfig::new("integration-secret"),
            Arc::new(InMemoryTokenBlacklist::new()),
        )),
        Arc::new(PasswordService::default()),
        Arc::new(social),
        notifier.clone(),
    );
    Accounts { auth, users, notifier }
}

fn registration(email: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: "Quiet-Harbor-42".to_string(),
        password_confirm: "Quiet-Harbor-42".to_string(),
        first_name: "Amel".to_string(),
        last_name: "Haddad".to_string(),
    }
}

/// Register and verify, returning the active account
async fn verified(accounts: &Accounts, email: &str) -> User {
    accounts.auth.register_user(registration(email)).await.unwrap();
    let token = accounts.notifier.last_verification();
    accounts.auth.verify_email(&token).await.unwrap().0
}

// Account lifecycle
mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_verify_login() {
        let a = accounts();
        let user = a.auth.register_user(registration("amel@example.com")).await.unwrap();
        assert!(!user.is_active);

        let token = a.notifier.last_verification();
        let (activated, tokens) = a.auth.verify_email(&token).await.unwrap();
        assert_eq!(activated.id, user.id);
        assert!(activated.is_active);
        assert!(!tokens.access.is_empty());
        assert!(!tokens.refresh.is_empty());

        let claims = a.auth.sessions().validate_access(&tokens.access).unwrap();
        assert_eq!(claims.sub, user.id);

        let (logged_in, _) = a
            .auth
            .login_user("amel@example.com", "Quiet-Harbor-42")
            .await
            .unwrap();
        assert!(logged_in.last_login.is_some());
    }

    #[tokio::test]
    async fn test_verification_token_is_single_use() {
        let a = accounts();
        a.auth.register_user(registration("once@example.com")).await.unwrap();
        let token = a.notifier.last_verification();

        assert!(a.auth.verify_email(&token).await.is_ok());
        let second = a.auth.verify_email(&token).await;
        assert!(matches!(second, Err(PlatformError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_reregistration_reuses_unverified_account() {
        let a = accounts();
        let first = a.auth.register_user(registration("again@example.com")).await.unwrap();
        let second = a.auth.register_user(registration("again@example.com")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(a.users.len(), 1);
        assert_eq!(a.notifier.verifications.lock().len(), 2);

        // Both links stay valid until used.
        let tokens: Vec<String> = a
            .notifier
            .verifications
            .lock()
            .iter()
            .map(|(_, t)| t.clone())
            .collect();
        assert_ne!(tokens[0], tokens[1]);
        assert!(a.auth.verify_email(&tokens[0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_registration_rejected_once_verified() {
        let a = accounts();
        verified(&a, "taken@example.com").await;

        match a.auth.register_user(registration("taken@example.com")).await {
            Err(PlatformError::InvalidFields { fields }) => {
                assert!(fields.contains_key("email"));
            }
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_was_wrong() {
        let a = accounts();
        verified(&a, "known@example.com").await;

        let unknown = a.auth.login_user("nobody@example.com", "Quiet-Harbor-42").await.unwrap_err();
        let wrong = a.auth.login_user("known@example.com", "Wrong-Harbor-42").await.unwrap_err();

        assert!(matches!(unknown, PlatformError::InvalidCredentials));
        assert!(matches!(wrong, PlatformError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_unverified_login_is_refused() {
        let a = accounts();
        a.auth.register_user(registration("pending@example.com")).await.unwrap();

        let result = a.auth.login_user("pending@example.com", "Quiet-Harbor-42").await;
        assert!(matches!(result, Err(PlatformError::EmailNotVerified)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_logout_revokes() {
        let a = accounts();
        let user = verified(&a, "rotate@example.com").await;
        let (_, tokens) = a.auth.login_user("rotate@example.com", "Quiet-Harbor-42").await.unwrap();

        let rotated = a.auth.refresh_session(&tokens.refresh).await.unwrap();
        assert!(a.auth.refresh_session(&tokens.refresh).await.is_err());

        a.auth.logout(&user, &rotated.refresh).await.unwrap();
        assert!(a.auth.refresh_session(&rotated.refresh).await.is_err());
    }
}

// Password reset
mod reset_tests {
    use super::*;

    #[tokio::test]
    async fn test_reset_changes_password_and_burns_token() {
        let a = accounts();
        verified(&a, "reset@example.com").await;

        a.auth.request_password_reset("reset@example.com").await.unwrap();
        let token = a.notifier.last_reset();

        a.auth
            .reset_password(&token, "Brand-New-Lantern-7", "Brand-New-Lantern-7")
            .await
            .unwrap();

        assert!(a.auth.login_user("reset@example.com", "Brand-New-Lantern-7").await.is_ok());
        assert!(a.auth.login_user("reset@example.com", "Quiet-Harbor-42").await.is_err());
        assert!(matches!(
            a.auth.verify_reset_token(&token).await,
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_is_silent() {
        let a = accounts();
        assert!(a.auth.request_password_reset("ghost@example.com").await.is_ok());
        assert!(a.notifier.resets.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_token_expires_after_an_hour() {
        let a = accounts();
        verified(&a, "clock@example.com").await;
        a.auth.request_password_reset("clock@example.com").await.unwrap();
        let token = a.notifier.last_reset();

        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        assert!(a.auth.verify_reset_token(&token).await.is_ok());

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(matches!(
            a.auth.verify_reset_token(&token).await,
            Err(PlatformError::InvalidToken { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_token_expires_after_a_day() {
        let a = accounts();
        a.auth.register_user(registration("late@example.com")).await.unwrap();
        let token = a.notifier.last_verification();

        tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;
        assert!(matches!(
            a.auth.verify_email(&token).await,
            Err(PlatformError::InvalidToken { .. })
        ));
        let stored = a.users.find_by_email("late@example.com").await.unwrap().unwrap();
        assert!(!stored.is_active);
    }
}

// Social sign-in against a stubbed provider
mod social_tests {
    use super::*;
    use realty_platform::service::SocialProvider;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_social_login_creates_active_user_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer provider-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "social@example.com",
                "name": "Yacine Belkacem"
            })))
            .mount(&server)
            .await;

        let a = accounts_with_social(
            SocialAuthService::new().with_endpoint(SocialProvider::Google, server.uri()),
        );

        let first = a.auth.social_login(SocialProvider::Google, "provider-token").await.unwrap();
        assert!(first.created);
        assert!(first.user.is_active);
        assert_eq!(first.user.first_name, "Yacine");
        assert!(first.user.has_permission("property.add"));

        let second = a.auth.social_login(SocialProvider::Google, "provider-token").await.unwrap();
        assert!(!second.created);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(a.users.len(), 1);
    }

    #[tokio::test]
    async fn test_social_login_uses_existing_unverified_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "pending@example.com"
            })))
            .mount(&server)
            .await;

        let a = accounts_with_social(
            SocialAuthService::new().with_endpoint(SocialProvider::Google, server.uri()),
        );
        a.auth.register_user(registration("pending@example.com")).await.unwrap();
        let existing = a.users.find_by_email("pending@example.com").await.unwrap().unwrap();

        let login = a.auth.social_login(SocialProvider::Google, "provider-token").await.unwrap();
        assert!(!login.created);
        assert_eq!(login.user.id, existing.id);
        assert!(!login.tokens.access.is_empty());
        assert_eq!(a.users.len(), 1);
    }

    #[tokio::test]
    async fn test_social_login_without_email_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": null,
                "name": "No Mail"
            })))
            .mount(&server)
            .await;

        let a = accounts_with_social(
            SocialAuthService::new().with_endpoint(SocialProvider::Facebook, server.uri()),
        );

        match a.auth.social_login(SocialProvider::Facebook, "provider-token").await {
            Err(PlatformError::Validation { message }) => {
                assert_eq!(message, "Email not provided by provider");
            }
            other => panic!("unexpected result: {:?}", other.map(|l| l.user.email)),
        }
        assert!(a.users.is_empty());
    }

    #[tokio::test]
    async fn test_social_login_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let a = accounts_with_social(
            SocialAuthService::new().with_endpoint(SocialProvider::GitHub, server.uri()),
        );

        let result = a.auth.social_login(SocialProvider::GitHub, "expired").await;
        assert!(matches!(result, Err(PlatformError::SocialAuth { .. })));
        assert!(a.users.is_empty());
    }
}

// Tenant resolution and lifecycle
mod tenant_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use realty_platform::cache::{CacheAvailability, CacheError, CacheResult, KeyValueCache};

    /// Backend that refuses every operation and counts the attempts
    #[derive(Default)]
    struct DownCache {
        calls: AtomicUsize,
    }

    impl DownCache {
        fn refuse<T>(&self) -> CacheResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl KeyValueCache for DownCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            self.refuse()
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            self.refuse()
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            self.refuse()
        }

        async fn take(&self, _key: &str) -> CacheResult<Option<String>> {
            self.refuse()
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    struct Tenancy {
        directory: Arc<InMemoryTenantDirectory>,
        cache: Arc<MemoryCache>,
        resolver: TenantResolver,
        tenants: TenantService,
    }

    fn tenancy(seed: Vec<Tenant>) -> Tenancy {
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants(seed));
        let cache = Arc::new(MemoryCache::new());
        let resolver = TenantResolver::new(
            directory.clone(),
            cache.clone(),
            TenantResolverConfig::default(),
        );
        let tenants = TenantService::new(
            directory.clone(),
            Arc::new(InMemoryAgencyRepository::new()),
            Arc::new(InMemoryPropertyRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
        );
        Tenancy {
            directory,
            cache,
            resolver,
            tenants,
        }
    }

    #[tokio::test]
    async fn test_resolution_is_cached_by_host() {
        let acme = Tenant::new("Acme", "acme.test").with_additional_domains(["www.acme.test"]);
        let t = tenancy(vec![acme.clone()]);

        let first = t.resolver.resolve("www.acme.test").await.unwrap();
        assert_eq!(first.id, acme.id);
        assert_eq!(t.directory.domain_lookup_count(), 2);
        let after_miss = t.directory.query_count();

        let cached = t
            .cache
            .get(&TenantResolver::cache_key("www.acme.test"))
            .await
            .unwrap();
        assert_eq!(cached.as_deref(), Some(acme.id.as_str()));

        // A hit skips the domain lookup and only re-reads the tenant by id.
        let second = t.resolver.resolve("www.acme.test").await.unwrap();
        assert_eq!(second.id, acme.id);
        assert_eq!(t.directory.domain_lookup_count(), 2);
        assert_eq!(t.directory.query_count(), after_miss + 1);
    }

    #[tokio::test]
    async fn test_resolution_without_cache_backend() {
        let acme = Tenant::new("Acme", "acme.test").with_additional_domains(["www.acme.test"]);
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants([acme.clone()]));
        let backend = Arc::new(DownCache::default());
        let resolver = TenantResolver::new(
            directory,
            backend.clone(),
            TenantResolverConfig::default(),
        );

        assert_eq!(resolver.resolve("acme.test").await.unwrap().id, acme.id);
        assert_eq!(resolver.resolve("www.acme.test").await.unwrap().id, acme.id);
        assert_eq!(resolver.resolve("www.acme.test").await.unwrap().id, acme.id);
        assert!(matches!(
            resolver.resolve("unknown.test").await,
            Err(PlatformError::TenantNotFound { .. })
        ));

        assert_eq!(resolver.cache_availability().await, CacheAvailability::Unavailable);
        // Only the availability check reached the backend.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deactivated_tenant_is_not_served_from_cache() {
        let t = tenancy(Vec::new());
        let acme = t.tenants.create_tenant(NewTenant::new("Acme", "acme.test")).await.unwrap();

        assert!(t.resolver.resolve("acme.test").await.is_ok());
        t.tenants.deactivate_tenant(&acme.id).await.unwrap();

        let result = t.resolver.resolve("acme.test").await;
        assert!(matches!(result, Err(PlatformError::TenantNotFound { .. })));
        let key = TenantResolver::cache_key("acme.test");
        assert_eq!(t.cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deleted_tenant_domain_can_be_reused() {
        let t = tenancy(Vec::new());
        let old = t.tenants.create_tenant(NewTenant::new("Old", "shared.test")).await.unwrap();
        assert_eq!(t.resolver.resolve("shared.test").await.unwrap().id, old.id);

        t.tenants.delete_tenant(&old.id).await.unwrap();
        let new = t.tenants.create_tenant(NewTenant::new("New", "shared.test")).await.unwrap();

        assert_eq!(t.resolver.resolve("shared.test").await.unwrap().id, new.id);
    }

    #[tokio::test]
    async fn test_unknown_host_is_not_found_and_not_cached() {
        let t = tenancy(vec![Tenant::new("Acme", "acme.test")]);

        let result = t.resolver.resolve("unknown.test").await;
        assert!(matches!(result, Err(PlatformError::TenantNotFound { ref domain }) if domain == "unknown.test"));
        let key = TenantResolver::cache_key("unknown.test");
        assert_eq!(t.cache.get(&key).await.unwrap(), None);

        // Registering the domain later takes effect immediately.
        let late = Tenant::new("Late", "unknown.test");
        t.directory.insert(&late).await.unwrap();
        assert_eq!(t.resolver.resolve("unknown.test").await.unwrap().id, late.id);
    }

    #[tokio::test]
    async fn test_localhost_falls_back_to_first_active_tenant() {
        let t = tenancy(vec![
            Tenant::new("Dormant", "dormant.test").inactive(),
            Tenant::new("Acme", "acme.test"),
        ]);

        let tenant = t.resolver.resolve("localhost").await.unwrap();
        assert_eq!(tenant.name, "Acme");
    }

    #[tokio::test]
    async fn test_localhost_prefers_dedicated_tenant() {
        let t = tenancy(vec![
            Tenant::new("Acme", "acme.test"),
            Tenant::new("Local", "localhost"),
        ]);

        assert_eq!(t.resolver.resolve("127.0.0.1").await.unwrap().name, "Local");
    }

    #[tokio::test]
    async fn test_localhost_without_tenants_fails() {
        let t = tenancy(Vec::new());
        let result = t.resolver.resolve("localhost").await;
        assert!(matches!(result, Err(PlatformError::DevelopmentTenantMissing)));
    }
}
