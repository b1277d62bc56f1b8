//! # Domain Layer
//!
//! Value objects and persisted entities of the shipment core.
//!
//! - [`value_objects`]: courier codes, payment modes, shipment statuses
//! - [`entities`]: addresses, order items, requests, tracking records and events
//! - [`errors`]: validation failures

pub mod entities;
pub mod errors;
pub mod value_objects;
