mod bootstrap;
pub mod engine;
pub mod finance;
pub mod health;
pub mod ledger;
pub mod report;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

use indago_core::config::{AppConfig, LoadOptions};

use crate::engine::ApprovalEngine;
use crate::finance::FinanceState;
use crate::ledger::LedgerState;
use crate::report::{ReportState, SalesReportClient};

fn init_logging(config: &AppConfig) {
    use indago_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let engine =
        Arc::new(ApprovalEngine::new(app.db_pool.clone(), app.config.approval.clone()));
    let sales = Arc::new(SalesReportClient::new(&app.config.sales));

    let router = Router::new()
        .merge(finance::router(FinanceState { db_pool: app.db_pool.clone(), engine }))
        .merge(ledger::router(LedgerState { db_pool: app.db_pool.clone() }))
        .merge(report::router(ReportState { db_pool: app.db_pool.clone(), sales }))
        .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "indago-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(event_name = "system.server.stopped", "indago-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
