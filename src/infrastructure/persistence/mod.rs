//! # Persistence Layer
//!
//! Shipment tracking storage.
//!
//! ## Port
//!
//! - [`TrackingStore`]: tracking rows and their event history
//!
//! ## Implementations
//!
//! - `in_memory`: in-memory store for tests and local runs
//! - `postgres`: PostgreSQL store backed by sqlx

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use traits::{StoreError, StoreResult, TrackingStore};
