//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::lock::LockManager;
use crate::store::TransactionManager;

pub use routes::{create_router, AppState};

/// Full application: ledger routes with context and logging middleware,
/// plus the unauthenticated health check.
pub fn build_app<T: TransactionManager, L: LockManager>(state: AppState<T, L>) -> Router {
    // Layers run last-added first: context -> logging -> handler
    let ledger_routes = create_router::<T, L>()
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(ledger_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
