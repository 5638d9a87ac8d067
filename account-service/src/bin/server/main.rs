use std::sync::Arc;
use std::time::Duration;

use account_service::config::Config;
use account_service::domain::account::gateway::AuthGateway;
use account_service::domain::account::gateway::ExternalProvider;
use account_service::domain::account::ports::AuthGatewayPort;
use account_service::domain::account::ports::UserStore;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::InMemoryUserStore;
use account_service::outbound::repositories::PostgresUserStore;
use auth::identity::HttpJwksSource;
use auth::identity::JwksCache;
use auth::identity::JwksCacheOptions;
use auth::Clock;
use auth::IdentityTokenVerifier;
use auth::SessionTokenService;
use auth::SystemClock;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "account_service=debug,auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        database = config.database.is_some(),
        provider = %config.external_provider.name,
        jwks_uri = %config.external_provider.jwks_uri,
        token_ttl_minutes = config.session.token_ttl_minutes,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let provider = &config.external_provider;
    let key_source = HttpJwksSource::new(
        &provider.jwks_uri,
        Duration::from_millis(provider.fetch_timeout_ms),
    )?;
    let keys = Arc::new(JwksCache::new(
        Arc::new(key_source),
        JwksCacheOptions {
            ttl: Duration::from_secs(provider.key_cache_ttl_secs),
            fetch_timeout: Duration::from_millis(provider.fetch_timeout_ms),
            ..JwksCacheOptions::default()
        },
    ));

    // Warm the cache; a failure here is retried on the first external login.
    match keys.refresh().await {
        Ok(count) => tracing::info!(keys = count, "Provider signing keys loaded"),
        Err(e) => tracing::warn!(error = %e, "Provider signing keys unavailable at startup"),
    }

    let verifier = Arc::new(
        IdentityTokenVerifier::new(keys, provider.issuers.clone(), Arc::clone(&clock))
            .with_leeway(chrono::Duration::seconds(provider.leeway_secs)),
    );
    let sessions = Arc::new(SessionTokenService::new(
        config.session.signing_secret.as_bytes(),
        chrono::Duration::minutes(config.session.token_ttl_minutes),
        Arc::clone(&clock),
    ));
    let external_provider = ExternalProvider {
        name: provider.name.clone(),
        client_id: provider.client_id.clone(),
    };

    let gateway = match &config.database {
        Some(database) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.url)
                .await?;
            tracing::info!(
                max_connections = database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            build_gateway(
                Arc::new(PostgresUserStore::new(pg_pool)),
                verifier,
                sessions,
                external_provider,
                clock,
            )
        }
        None => {
            tracing::warn!("No database configured, accounts are kept in memory");
            build_gateway(
                Arc::new(InMemoryUserStore::new()),
                verifier,
                sessions,
                external_provider,
                clock,
            )
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(gateway)).await?;

    tracing::info!("Server exited");

    Ok(())
}

fn build_gateway<S>(
    store: Arc<S>,
    verifier: Arc<IdentityTokenVerifier>,
    sessions: Arc<SessionTokenService>,
    provider: ExternalProvider,
    clock: Arc<dyn Clock>,
) -> Arc<dyn AuthGatewayPort>
where
    S: UserStore,
{
    Arc::new(AuthGateway::new(store, verifier, sessions, provider, clock))
}
