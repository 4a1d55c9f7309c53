use std::sync::Arc;

use migration::{Migrator, MigratorTrait};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "arth={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let config_text = tokio::fs::read_to_string(&settings.config_path).await?;
    let config = engine::Config::from_yaml(&config_text)?;
    tracing::info!("loaded ledger configuration from {}", settings.config_path);

    let db = connect_database(&config.db_path).await?;

    let engine = engine::Engine::builder()
        .database(db)
        .config(config)
        .build()
        .await?;

    let bind = settings.server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(Arc::new(engine), listener).await?;

    Ok(())
}

async fn connect_database(
    path: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = if path.is_empty() {
        String::from("sqlite::memory:")
    } else {
        format!("sqlite:{path}?mode=rwc")
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
