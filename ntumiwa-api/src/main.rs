use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ntumiwa::{AppConfig, LogConfig, LogStyle};

mod server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(&config.log);

    tracing::info!(app_env = ?config.app_env, "Starting ntumiwa-api");
    server::run(config).await
}

/// `RUST_LOG` wins over `LOG_LEVEL` when both are set.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);

    match log.style {
        LogStyle::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogStyle::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
