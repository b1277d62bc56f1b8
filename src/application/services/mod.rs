//! # Application Services
//!
//! Services that orchestrate courier adapters and the tracking store.
//!
//! - [`ShipmentAggregationService`]: concurrent multi-courier rate and
//!   serviceability fan-out, plus single-courier booking, tracking,
//!   cancellation and NDR calls
//! - [`CourierRegistry`]: courier codes mapped to adapters and limiters
//! - [`TrackingService`]: shipment rows and their event history

pub mod registry;
pub mod shipment_aggregation;
#[cfg(test)]
pub(crate) mod testing;
pub mod tracking;

pub use registry::{CourierRegistry, CourierStatus, RegisteredCourier};
pub use shipment_aggregation::{AggregationConfig, ShipmentAggregationService};
pub use tracking::{ShipmentPage, TrackingEventPolicy, TrackingService};
