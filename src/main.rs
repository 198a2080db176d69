use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use soroban_webhook_relayer::api::create_router;
use soroban_webhook_relayer::app::AppState;
use soroban_webhook_relayer::domain::error::ConfigError;
use soroban_webhook_relayer::domain::traits::{TransactionStore, UserStore, WalletStore};
use soroban_webhook_relayer::infra::{PostgresConfig, PostgresStore, ResendClient, ResendConfig};

#[derive(Debug)]
struct Config {
    database_url: String,
    host: String,
    port: u16,
    resend_api_key: String,
    email_from: String,
    webhook_secret: Option<String>,
    cache_ttl: Duration,
    cache_sweep_interval: Duration,
}

impl Config {
    fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let resend_api_key = require("RESEND_API_KEY")?;
        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Soroban Relayer <notifications@resend.dev>".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let webhook_secret = env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
        let port = parse_env("PORT", 3000u16)?;
        let cache_ttl = Duration::from_secs(parse_env("CACHE_TTL_SECS", 300u64)?);
        let cache_sweep_interval =
            Duration::from_secs(parse_env("CACHE_SWEEP_INTERVAL_SECS", 60u64)?);

        Ok(Self {
            database_url,
            host,
            port,
            resend_api_key,
            email_from,
            webhook_secret,
            cache_ttl,
            cache_sweep_interval,
        })
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,soroban_webhook_relayer=debug")),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    let store = Arc::new(
        PostgresStore::connect(&PostgresConfig::new(config.database_url.clone())).await?,
    );
    let email = Arc::new(ResendClient::new(ResendConfig::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    )));

    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn TransactionStore>,
        Arc::clone(&store) as Arc<dyn WalletStore>,
        store as Arc<dyn UserStore>,
        email,
        config.cache_ttl,
    )
    .with_webhook_secret(config.webhook_secret.clone());

    state.service.cache().run_sweeper(config.cache_sweep_interval);

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(host = %config.host, port = config.port, "webhook relayer listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
