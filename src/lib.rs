pub mod core;
pub mod providers;
pub mod route;
pub mod server;
pub mod valuation;

use crate::core::config::AppConfig;
use crate::core::portfolio::Portfolio;
use crate::providers::{BudaProvider, CachingPriceProvider};
use crate::valuation::Valuator;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Value { portfolio_path: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Portfolio valuator starting...");

    let config = AppConfig::load(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => serve(&config).await,
        AppCommand::Value { portfolio_path } => {
            let result = value_file(&config, &portfolio_path).await?;
            println!("{result}");
            Ok(())
        }
    }
}

/// Builds the valuator over a cached Buda price provider.
pub fn build_valuator(config: &AppConfig) -> Result<Valuator> {
    let buda = BudaProvider::new(&config.providers.buda)
        .context("Failed to create Buda price provider")?;
    let provider = CachingPriceProvider::new(
        buda,
        Duration::from_secs(config.pricing.quote_ttl_secs),
        Duration::from_secs(config.pricing.markets_ttl_secs),
    );
    Ok(Valuator::new(
        Arc::new(provider),
        config.pricing.bridge_currencies.clone(),
    ))
}

pub fn build_app(config: &AppConfig) -> Result<axum::Router> {
    let state = server::AppState {
        valuator: build_valuator(config)?,
    };
    Ok(server::router(state))
}

pub async fn serve(config: &AppConfig) -> Result<()> {
    let app = build_app(config)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Values a YAML (or JSON) portfolio file and renders the result as JSON.
pub async fn value_file(config: &AppConfig, portfolio_path: &str) -> Result<String> {
    let content = std::fs::read_to_string(portfolio_path)
        .with_context(|| format!("Failed to read portfolio file: {portfolio_path}"))?;
    let portfolio: Portfolio = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse portfolio file: {portfolio_path}"))?;

    let valuator = build_valuator(config)?;
    let result = valuator.value(&portfolio).await?;
    serde_json::to_string_pretty(&result).context("Failed to render valuation")
}
