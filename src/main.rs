//! Golbarg flower shop backend

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use golbarg_shop::api::{self, AppState};
use golbarg_shop::config::Config;
use golbarg_shop::events::EventPublisher;
use golbarg_shop::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.database_url).await?;
    let store = PgStore::new(pool);
    store.migrate().await?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let app = api::router(AppState::new(Arc::new(store), &config, events));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, shipping_fee = %config.shipping_fee, "golbarg shop listening");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
