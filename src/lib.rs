//! # shipment-hub
//!
//! Shipment aggregation core for a multi-courier e-commerce backend.
//!
//! A single logical request (rate quote, serviceability check, shipment
//! creation, tracking) is fanned out to several third-party courier APIs,
//! each behind its own token-bucket rate limiter. Partial successes and
//! failures are merged into one response, and the shipment lifecycle is
//! persisted for later reconciliation.
//!
//! # Layers
//!
//! - [`domain`]: value objects and persisted entities
//! - [`infrastructure`]: courier adapters, rate limiting, persistence
//! - [`application`]: the aggregation service and its DTOs
//! - [`api`]: the JSON-over-HTTP surface consumed by the gateway
//! - [`config`]: environment-driven configuration

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::error::{ApplicationError, ApplicationResult};
pub use application::services::{CourierRegistry, ShipmentAggregationService, TrackingService};
pub use config::AppConfig;
