//! Realty Platform Server
//!
//! Production server for the tenant-scoped REST APIs:
//! - Accounts: registration, verification, login, password reset, social sign-in, profile
//! - Catalog: published property listings of the tenant bound to the request host
//! - Monitoring: health and readiness on a separate port
//!
//! Configuration comes from `config/realty.toml` (or `REALTY_CONFIG`) and the
//! `REALTY_*` environment variables documented in `realty-config`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use realty_config::{AppConfig, StorageBackend};
use realty_platform::api::{
    accounts_router, properties_router, resolve_tenant, AccountsState, PlatformApiDoc,
    PropertiesState,
};
use realty_platform::cache::{CacheAvailability, KeyValueCache, MemoryCache, RedisCache};
use realty_platform::repository::{
    ensure_indexes, AgencyRepository, AgencyStore, InMemoryAgencyRepository,
    InMemoryPropertyRepository, InMemoryTenantDirectory, InMemoryTokenBlacklist,
    InMemoryUserRepository, PropertyRepository, PropertyStore, TenantDirectory, TenantRepository,
    TokenBlacklist, TokenBlacklistRepository, UserRepository, UserStore,
};
use realty_platform::service::{
    AuthService, CatalogService, HttpMailer, LogMailer, Mailer, NotificationConfig,
    NotificationDispatcher, PasswordService, SessionConfig, SessionTokenService,
    SocialAuthService, TenantResolver, TenantResolverConfig, TokenStore,
};
use realty_platform::Tenant;

/// Storage handles shared by the services
struct Storage {
    tenants: Arc<dyn TenantDirectory>,
    users: Arc<dyn UserStore>,
    agencies: Arc<dyn AgencyStore>,
    properties: Arc<dyn PropertyStore>,
    blacklist: Arc<dyn TokenBlacklist>,
    cache: Arc<dyn KeyValueCache>,
}

async fn mongo_storage(config: &AppConfig) -> Result<Storage> {
    let storage = &config.storage;
    info!("Connecting to MongoDB: {}/{}", storage.mongo_url, storage.mongo_db);
    let client = mongodb::Client::with_uri_str(&storage.mongo_url)
        .await
        .context("connecting to MongoDB")?;
    let db = client.database(&storage.mongo_db);
    ensure_indexes(&db).await.context("creating MongoDB indexes")?;

    let cache = RedisCache::connect(&storage.redis_url)
        .await
        .context("connecting to the cache backend")?;

    Ok(Storage {
        tenants: Arc::new(TenantRepository::new(&db)),
        users: Arc::new(UserRepository::new(&db)),
        agencies: Arc::new(AgencyRepository::new(&db)),
        properties: Arc::new(PropertyRepository::new(&db)),
        blacklist: Arc::new(TokenBlacklistRepository::new(&db)),
        cache: Arc::new(cache),
    })
}

/// Process-local storage with a `localhost` tenant so the API answers out of the box.
fn memory_storage() -> Storage {
    let tenants = InMemoryTenantDirectory::with_tenants([Tenant::new("Development", "localhost")]);
    warn!("Using in-memory storage; data is lost on restart");

    Storage {
        tenants: Arc::new(tenants),
        users: Arc::new(InMemoryUserRepository::new()),
        agencies: Arc::new(InMemoryAgencyRepository::new()),
        properties: Arc::new(InMemoryPropertyRepository::new()),
        blacklist: Arc::new(InMemoryTokenBlacklist::new()),
        cache: Arc::new(MemoryCache::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    realty_common::init_logging(config.logging.format);

    info!("Starting Realty Platform Server");

    let storage = match config.storage.backend {
        StorageBackend::Mongo => mongo_storage(&config).await?,
        StorageBackend::Memory => memory_storage(),
    };
    info!("Storage initialized");

    // Tenant resolution
    let resolver = Arc::new(TenantResolver::new(
        storage.tenants.clone(),
        storage.cache.clone(),
        TenantResolverConfig {
            cache_ttl: Duration::from_secs(config.tenancy.cache_ttl_secs),
            development_hosts: config.tenancy.development_hosts.clone(),
        },
    ));

    // Notifications
    let mailer: Arc<dyn Mailer> = match &config.mail.relay_url {
        Some(url) => {
            info!(relay = %url, "Delivering email through HTTP relay");
            Arc::new(HttpMailer::new(url.clone()))
        }
        None => {
            info!("No mail relay configured, emails go to the log");
            Arc::new(LogMailer)
        }
    };
    let notifier = Arc::new(NotificationDispatcher::new(
        mailer,
        NotificationConfig {
            frontend_url: config.mail.frontend_url.clone(),
            from_email: config.mail.from_email.clone(),
        },
    ));

    // Accounts
    let sessions = Arc::new(SessionTokenService::new(
        SessionConfig {
            secret: config.auth.jwt_secret.clone(),
            issuer: config.auth.issuer.clone(),
            access_ttl: Duration::from_secs(config.auth.access_token_lifetime_secs),
            refresh_ttl: Duration::from_secs(config.auth.refresh_token_lifetime_secs),
        },
        storage.blacklist.clone(),
    ));
    let social = SocialAuthService::new().with_endpoints(config.social.endpoints.iter());
    let auth_service = Arc::new(AuthService::new(
        storage.users.clone(),
        TokenStore::new(storage.cache.clone()),
        sessions,
        Arc::new(PasswordService::default()),
        Arc::new(social),
        notifier,
    ));
    info!("Auth services initialized");

    // Catalog
    let catalog = Arc::new(CatalogService::new(
        storage.agencies.clone(),
        storage.properties.clone(),
    ));

    // Build platform API router
    let app = Router::new()
        .nest("/api/v1/accounts", accounts_router(AccountsState { auth_service }))
        .nest("/api/v1", properties_router(PropertiesState { catalog }))
        .layer(axum::middleware::from_fn_with_state(resolver.clone(), resolve_tenant))
        // OpenAPI / Swagger UI, reachable without a tenant
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", PlatformApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    // Start API server
    let api_addr = format!("0.0.0.0:{}", config.server.api_port);
    info!("API server listening on http://{}", api_addr);
    let api_listener = TcpListener::bind(&api_addr).await?;
    let api_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(api_listener, app).await {
            tracing::error!("API server failed: {}", e);
        }
    });

    // Start health server
    let health_addr = format!("0.0.0.0:{}", config.server.health_port);
    info!("Health server listening on http://{}/health", health_addr);
    let health_app = Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(resolver);
    let health_listener = TcpListener::bind(&health_addr).await?;
    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(health_listener, health_app).await {
            tracing::error!("Health server failed: {}", e);
        }
    });

    info!("Realty Platform Server started");
    info!("Press Ctrl+C to shutdown");

    shutdown_signal().await;
    info!("Shutdown signal received...");

    api_task.abort();
    health_task.abort();

    info!("Realty Platform Server shutdown complete");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready even when the cache is down: tenant lookups fall back to the directory.
async fn ready_handler(State(resolver): State<Arc<TenantResolver>>) -> Json<serde_json::Value> {
    let cache = match resolver.cache_availability().await {
        CacheAvailability::Available => "UP",
        CacheAvailability::Unavailable => "DEGRADED",
    };
    Json(serde_json::json!({
        "status": "READY",
        "cache": cache
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
