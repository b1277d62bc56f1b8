//! # PostgreSQL Persistence
//!
//! sqlx-backed store implementation.

pub mod tracking_store;

pub use tracking_store::PostgresTrackingStore;
