//! Grocery Price-Comparison Backend
//!
//! A REST backend with SQLite persistence: imports per-store CSV price and
//! discount feeds, serves aggregation reports, and manages user baskets and
//! price alerts.

mod alerts;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod importer;
mod models;
mod reports;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting price-comparison backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Feed data directory: {:?}", config.data_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo: repo.clone(),
        config: Arc::new(config.clone()),
    };

    // Spawn the periodic price-alert checker
    let interval = Duration::from_secs(config.alert_check_interval_secs);
    tokio::spawn(alerts::run(repo, interval));

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Feed imports
        .route("/import/products", get(api::import_products))
        .route("/import/discounts", get(api::import_discounts))
        // Product reports
        .route("/products/best-discounts", get(api::best_discounts))
        .route("/products/new-discounts", get(api::new_discounts))
        .route("/products/price-history", get(api::price_history))
        .route("/products/recommendations", get(api::recommendations))
        // Users, baskets, alerts
        .route("/users/register", post(api::register_user))
        .route("/users/set-alert", post(api::set_alert))
        .route("/users/add-products/{user_id}", post(api::add_products_to_basket))
        .route("/users/optimize-basket/{user_id}", get(api::optimize_basket));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
