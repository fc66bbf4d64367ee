//! HTTP API Layer
//!
//! This crate provides the REST API for quoting and premium calculation
//! using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for quotes and health
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! Handlers talk to `domain_quote::QuoteService`; storage is whatever
//! `QuotePort` the router is built with.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let port: Arc<dyn QuotePort> = Arc::new(PostgresQuoteAdapter::new(pool));
//! let app = create_router(port, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::cors::{CorsLayer, Any};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_quote::{QuotePort, QuoteService};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{health, quotes};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: QuoteService,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `port` - Storage port backing the quote service
/// * `config` - API configuration
pub fn create_router(port: Arc<dyn QuotePort>, config: ApiConfig) -> Router {
    let service = QuoteService::new(port).with_auto_calculate(config.auto_calculate);
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let quote_routes = Router::new()
        .route("/", get(quotes::list_quotes).post(quotes::create_quote))
        .route("/:id", get(quotes::get_quote).put(quotes::update_quote))
        .route("/:id/calculate", post(quotes::calculate_quote))
        .route("/:id/submit", put(quotes::submit_quote))
        .route("/:id/revise", put(quotes::revise_quote))
        .route("/:id/bind", put(quotes::bind_quote))
        .route("/:id/revise-bind", put(quotes::revise_binding));

    // Audit runs inside auth so it sees the caller's claims
    let api_routes = Router::new()
        .nest("/quotes", quote_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
