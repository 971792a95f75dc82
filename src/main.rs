use std::sync::Arc;

use anyhow::Result;
use gym_manager::api::{create_routes, AppState};
use gym_manager::config::{run_migrations, AppConfig, DatabaseConfig};
use gym_manager::store::PgGymStore;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let database = DatabaseConfig::from_env()?;
    let pool = database.create_pool().await?;
    run_migrations(&pool).await?;

    let address = config.server_address();
    let state = AppState::new(config, Arc::new(PgGymStore::new(pool)))?;
    let app = create_routes(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Gym manager starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
