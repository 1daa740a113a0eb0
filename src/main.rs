use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use migration::{Migrator, MigratorTrait};
use songbook_server::api::{self, AppState};
use songbook_server::config::Config;
use songbook_server::logger;
use songbook_server::spotify::SpotifyClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let dotenv_result = dotenv::dotenv();
    let config = Config::from_env();
    logger::init(config.log_level).map_err(|e| e.to_string())?;

    if dotenv_result.is_err() {
        info!("No .env file found, using environment variables");
    }

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);
    let db: DatabaseConnection = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;
    info!("Database connected and migrated successfully");

    let mut state = AppState::new(db).with_search_limit(config.search_limit);
    match SpotifyClient::from_config(&config) {
        Ok(Some(spotify)) => {
            info!("Spotify client initialized successfully");
            state = state.with_catalog(Arc::new(spotify));
        }
        Ok(None) => {}
        Err(e) => error!("Spotify initialization failed: {}", e),
    }

    let app = api::create_router(state).layer(api::cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server starting on {}", config.bind_address());
    axum::serve(listener, app).await?;

    Ok(())
}
