use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use auth::Authenticator;
use auth::HashingCost;
use auth::PasswordHasher;
use chrono::Duration;
use chrono::Utc;
use identity_service::authentication::identity::IdentityResolver;
use identity_service::authentication::ledger::RefreshTokenLedger;
use identity_service::authentication::lockout::LockoutGuard;
use identity_service::authentication::ports::OAuthStateStore;
use identity_service::authentication::service::AuthService;
use identity_service::config::Config;
use identity_service::inbound::http::cookies::CookieSettings;
use identity_service::inbound::http::router::create_router;
use identity_service::inbound::http::router::HttpSettings;
use identity_service::outbound::oauth::GoogleOAuthClient;
use identity_service::outbound::state::InMemoryStateStore;
use identity_service::repositories::login_attempt::PostgresLoginAttemptRepository;
use identity_service::repositories::refresh_token::PostgresRefreshTokenRepository;
use identity_service::repositories::user::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type ConfiguredAuthService = AuthService<
    PostgresUserRepository,
    PostgresRefreshTokenRepository,
    PostgresLoginAttemptRepository,
    InMemoryStateStore,
    GoogleOAuthClient,
>;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        access_token_minutes = config.jwt.access_token_expiration_minutes,
        refresh_token_days = config.session.refresh_token_expiration_days,
        revoke_all_on_reuse = config.session.revoke_all_on_reuse,
        lockout_max_failures = config.lockout.max_failed_attempts,
        lockout_window_minutes = config.lockout.window_minutes,
        cookie_secure = config.cookie.secure,
        frontend_url = %config.frontend.url,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let password_hasher = PasswordHasher::with_cost(HashingCost {
        memory_kib: config.password.memory_kib,
        iterations: config.password.iterations,
        parallelism: config.password.parallelism,
    })?;
    let authenticator = Arc::new(
        Authenticator::new(config.jwt.secret.as_bytes())
            .with_password_hasher(password_hasher)
            .with_access_token_ttl(Duration::minutes(
                config.jwt.access_token_expiration_minutes,
            )),
    );

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let token_repository = Arc::new(PostgresRefreshTokenRepository::new(pg_pool.clone()));
    let attempt_repository = Arc::new(PostgresLoginAttemptRepository::new(pg_pool));
    let state_store = Arc::new(InMemoryStateStore::new(Duration::minutes(
        config.oauth.state_ttl_minutes,
    )));
    let oauth_provider = Arc::new(GoogleOAuthClient::new(config.oauth.google.clone())?);

    let auth_service = Arc::new(AuthService::new(
        IdentityResolver::new(user_repository),
        RefreshTokenLedger::new(token_repository, config.session_policy()),
        LockoutGuard::new(attempt_repository, config.lockout_policy()),
        Arc::clone(&state_store),
        oauth_provider,
        authenticator,
    ));

    spawn_state_sweeper(
        state_store,
        StdDuration::from_secs(config.oauth.state_sweep_interval_seconds),
    );
    spawn_maintenance(Arc::clone(&auth_service), &config);

    let settings = HttpSettings {
        cookies: CookieSettings {
            secure: config.cookie.secure,
            refresh_path: config.cookie.path.clone(),
            refresh_max_age_seconds: config.session_policy().refresh_token_ttl.num_seconds(),
        },
        frontend_url: config.frontend.url.clone(),
        allowed_origins: config.frontend.allowed_origins.clone(),
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, settings);
    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

/// Periodically drop CSRF states that expired without being consumed.
fn spawn_state_sweeper(state_store: Arc<InMemoryStateStore>, period: StdDuration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match state_store.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Swept expired OAuth states"),
                Err(e) => tracing::warn!(error = %e, "OAuth state sweep failed"),
            }
        }
    });
}

/// Periodically purge expired refresh tokens and old sign-in attempts.
fn spawn_maintenance(auth_service: Arc<ConfiguredAuthService>, config: &Config) {
    let period = StdDuration::from_secs(config.maintenance.interval_seconds);
    let token_retention = Duration::days(config.maintenance.expired_token_retention_days);
    // Never purge attempts that still count towards a lockout.
    let attempt_retention = Duration::days(config.maintenance.login_attempt_retention_days)
        .max(config.lockout_policy().window);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let now = Utc::now();
            match auth_service
                .purge_stale_records(now - token_retention, now - attempt_retention)
                .await
            {
                Ok((tokens, attempts)) => {
                    tracing::info!(tokens, attempts, "Purged stale authentication records")
                }
                Err(e) => tracing::error!(error = %e, "Maintenance purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
