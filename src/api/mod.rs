//! HTTP surface over the pack optimizer.

pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderName, Method, Request},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::domain::PackOptimizer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub optimizer: Arc<PackOptimizer>,
    pub backend_url: Arc<str>,
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/v1/packs", get(handlers::list_packs).post(handlers::add_pack))
        .route("/v1/packs/:size", delete(handlers::delete_pack))
        .route("/v1/order", post(handlers::calculate_order))
        .fallback(handlers::not_found)
        .layer(cors_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}
