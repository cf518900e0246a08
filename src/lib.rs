pub mod config;
pub mod crypto;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod operators;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::operators::OperatorRegistry;
use crate::services::ExchangeService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub operators: OperatorRegistry,
    pub exchange: ExchangeService,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let operators = OperatorRegistry::new(&config);
        let exchange = ExchangeService::new(db.clone(), operators.clone());
        Self {
            db,
            config,
            operators,
            exchange,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/exchangeFunds", post(handlers::exchange::exchange_funds))
        .route("/transactions/:id", get(handlers::exchange::get_transaction))
        .route(
            "/transactions/:id/confirm",
            post(handlers::exchange::confirm_exchange),
        )
        .route("/encrypt-pin", post(handlers::pin::encrypt_pin))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
