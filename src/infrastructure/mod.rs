//! # Infrastructure Layer
//!
//! Adapters to the outside world.
//!
//! - [`couriers`]: courier provider port and per-courier adapters
//! - [`rate_limit`]: per-provider token-bucket throttle
//! - [`persistence`]: shipment tracking store (in-memory and PostgreSQL)

pub mod couriers;
pub mod persistence;
pub mod rate_limit;
