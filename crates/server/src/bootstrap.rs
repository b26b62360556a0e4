use thiserror::Error;
use tracing::info;

use indago_core::config::{AppConfig, ConfigError, LoadOptions};
use indago_db::{connect_from_config, fixtures, migrations, DbPool, RepositoryError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("fixture seeding failed: {0}")]
    Seed(#[source] RepositoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_from_config(&config.database)
        .await
        .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let seeded = fixtures::seed_weekly_orders_if_empty(&db_pool)
        .await
        .map_err(BootstrapError::Seed)?;
    if seeded > 0 {
        info!(event_name = "system.bootstrap.fixtures_seeded", rows = seeded, "demo orders seeded");
    }

    Ok(Application { config, db_pool })
}
