pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod repository;
pub mod seed;
pub mod services;
pub mod telemetry;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use repository::FilmsRepository;
use services::OrderService;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub films: Arc<dyn FilmsRepository>,
    pub orders: OrderService,
    pub config: config::Config,
}

impl AppState {
    /// Поднимает хранилище и, если задан `CATALOG_SEED`, наполняет каталог.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let films = repository::connect(&config).await?;

        if let Some(path) = &config.catalog.seed_path {
            info!("Seeding catalog from {}", path.display());
            let documents = seed::load_catalog(path).await?;
            seed::seed_catalog(films.as_ref(), documents).await?;
        }

        Ok(Self::with_repository(films, config))
    }

    pub fn with_repository(films: Arc<dyn FilmsRepository>, config: config::Config) -> Arc<Self> {
        let orders = OrderService::new(films.clone());
        Arc::new(Self { films, orders, config })
    }
}

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = middleware::cors_layer(&state.config.app)?;

    Ok(Router::new()
        .route("/", get(|| async { "Afisha API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api/afisha", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}
