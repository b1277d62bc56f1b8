//! # REST Routes
//!
//! Route table for the `/api/v1` surface.

use crate::api::rest::handlers::{self, AppState};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the API router with request tracing and permissive CORS.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(courier_routes())
        .merge(shipment_routes())
}

fn courier_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rates", post(handlers::calculate_rates))
        .route("/couriers/available", post(handlers::available_couriers))
        .route(
            "/couriers/{code}/ndr",
            get(handlers::list_ndr).post(handlers::update_ndr),
        )
}

fn shipment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shipments", post(handlers::create_shipment))
        .route(
            "/shipments/{tracking_id}",
            get(handlers::get_shipment).delete(handlers::archive_shipment),
        )
        .route(
            "/shipments/{tracking_id}/tracking",
            get(handlers::track_shipment),
        )
        .route(
            "/shipments/{tracking_id}/cancel",
            post(handlers::cancel_shipment),
        )
        .route("/orders/{order_id}/shipment", get(handlers::get_order_shipment))
        .route(
            "/accounts/{account_id}/shipments",
            get(handlers::list_account_shipments),
        )
}
