pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod validation;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::TransactionService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TransactionService>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/transaction/create", post(handlers::create_transaction))
        .route(
            "/transaction/:id/retrieve",
            get(handlers::retrieve_transaction),
        )
        .route(
            "/transaction/:id/retrieve/status",
            get(handlers::retrieve_transaction_status),
        )
        .route("/transaction/:id/edit", post(handlers::edit_transaction))
        .route("/transaction/:id/accept", post(handlers::accept_transaction))
        .route("/transaction/:id/cancel", post(handlers::cancel_transaction))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
