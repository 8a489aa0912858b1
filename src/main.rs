use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use server::make_app;
use store::{MemoryStore, PgStore, Store};

#[cfg(test)]
mod client;
mod config;
mod datamodel;
mod error;
mod range;
mod server;
mod store;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "azdev_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            tracing::info!(max_connections = db.max_connections, "connecting to Postgres");
            Arc::new(
                PgStore::connect(db)
                    .await
                    .context("Failed to connect to the database")?,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, serving the built-in sample dataset");
            Arc::new(MemoryStore::seeded())
        }
    };

    let app = make_app(store);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "GraphQL server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
