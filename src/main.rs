//! conclave-migrate - applies the embedded schema migrations.
//!
//! Reads `CONCLAVE__*` configuration, connects to PostgreSQL and runs
//! every pending migration.

use conclave::adapters::postgres::PostgresStore;
use conclave::config::AppConfig;
use conclave::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.logging)?;
    config.validate()?;

    let store = PostgresStore::connect(&config.database).await?;
    tracing::info!("Connected to database, applying migrations");
    store.migrate().await?;
    tracing::info!("Migrations applied");

    Ok(())
}
