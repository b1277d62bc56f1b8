//! # Entities
//!
//! - [`Address`], [`OrderItem`]: shipment request building blocks
//! - [`RateRequest`], [`ShipmentRequest`]: validated courier requests
//! - [`ShipmentTracking`]: persisted tracking record, one per booked shipment
//! - [`ShipmentEvent`]: append-only tracking history row

pub mod address;
pub mod requests;
pub mod tracking;

pub use address::{Address, OrderItem};
pub use requests::{RateRequest, ShipmentRequest};
pub use tracking::{NewShipmentEvent, NewShipmentTracking, ShipmentEvent, ShipmentTracking};
