//! HTTP surface: router, shared state and handlers.

pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod orders;
pub mod products;
pub mod profile;

use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::events::EventPublisher;
use crate::services::{CatalogService, OrderService, ProfileService};
use crate::store::{AccountStore, CatalogStore};

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub profiles: ProfileService,
    pub accounts: Arc<dyn AccountStore>,
    pub session_cookie: Arc<str>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, config: &Config, events: EventPublisher) -> Self
    where
        S: CatalogStore + AccountStore + 'static,
    {
        Self {
            orders: OrderService::new(store.clone(), config.shipping_fee, events),
            catalog: CatalogService::new(store.clone()),
            profiles: ProfileService::new(store.clone()),
            accounts: store,
            session_cookie: Arc::from(config.session_cookie.as_str()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "golbarg-shop"})) }))
        .route("/products", get(products::list_products))
        .route("/products/:slug", get(products::get_product))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/:id/pay", post(orders::pay_order))
        .route("/profile", get(profile::get_profile).post(profile::save_profile))
        .route("/admin/orders", get(admin::list_orders))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
