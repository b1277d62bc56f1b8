//! # REST API
//!
//! JSON-over-HTTP surface for the shipment core, built on axum.
//!
//! # Endpoints
//!
//! ## Rates and serviceability
//! - `POST /api/v1/rates` - Quote rates across couriers
//! - `POST /api/v1/couriers/available` - List couriers serving a route
//!
//! ## Shipments
//! - `POST /api/v1/shipments` - Book a shipment with one courier
//! - `GET /api/v1/shipments/{tracking_id}` - Shipment with its event history
//! - `DELETE /api/v1/shipments/{tracking_id}` - Archive a shipment
//! - `GET /api/v1/shipments/{tracking_id}/tracking` - Live courier tracking
//!   (`courier_code`, `refresh` query parameters)
//! - `POST /api/v1/shipments/{tracking_id}/cancel` - Cancel with the courier
//! - `GET /api/v1/orders/{order_id}/shipment` - Shipment for an order
//! - `GET /api/v1/accounts/{account_id}/shipments` - Paginated account
//!   listing (`page`, `page_size`)
//!
//! ## Non-delivery reports
//! - `GET /api/v1/couriers/{code}/ndr` - Pending NDRs (`page`, `limit`)
//! - `POST /api/v1/couriers/{code}/ndr` - Submit NDR actions
//!
//! ## Health
//! - `GET /api/v1/health` - Liveness, registered couriers and their
//!   remaining rate-limit tokens
//!
//! Errors are returned as `{"error": "..."}` with a status derived from
//! the [`ApplicationError`](crate::application::error::ApplicationError)
//! variant.
//!
//! # Usage
//!
//! ```ignore
//! use shipment_hub::api::rest::{create_router, AppState};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(Arc::new(service)));
//! let router = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    AppState, CancelQuery, ErrorResponse, HealthResponse, NdrQuery, NdrUpdateRequest,
    NdrUpdateResponse, PaginationParams, TrackingQuery, status_for,
};
pub use routes::create_router;
