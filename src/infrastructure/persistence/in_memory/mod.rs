//! # In-Memory Persistence
//!
//! In-memory store implementation for tests and local development.

pub mod tracking_store;

pub use tracking_store::InMemoryTrackingStore;
