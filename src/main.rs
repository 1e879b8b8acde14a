mod advisor;
mod config;
mod dashboard;
mod error;
mod filter;
mod history;
mod record;
mod scoring;
mod store;
mod web;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::web::server::WebServer;

const DEFAULT_CONFIG_PATH: &str = "circuit-optimizer.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circuit_optimizer=info,tower_http=info".into()),
        )
        .init();

    info!("📡 circuit-optimizer v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config: explicit path must exist, the default one may be absent
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            let config = Config::load(&path)?;
            info!("Config loaded from {}", path);
            config
        }
        None => match Config::load_optional(DEFAULT_CONFIG_PATH)? {
            Some(config) => {
                info!("Config loaded from {}", DEFAULT_CONFIG_PATH);
                config
            }
            None => {
                info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                Config::default()
            }
        },
    };

    // Credentials from .env / environment override the file
    dotenvy::dotenv().ok();
    config.apply_env();

    let config = Arc::new(config);

    // Initialize dashboard (data provider, scorer, advisors, history)
    let dashboard = Arc::new(Dashboard::new(config.clone())?);
    dashboard.reload().await;

    let web = WebServer::new(dashboard, config);
    web.run().await
}
