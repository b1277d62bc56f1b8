//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! - [`CourierCode`]: normalized courier identifier (`XPRESSBEES`, ...)
//! - [`PaymentMode`]: `COD` or `PREPAID`
//! - [`ShipmentStatus`]: well-known lifecycle statuses

pub mod enums;
pub mod ids;

pub use enums::{ParseEnumError, PaymentMode, ShipmentStatus};
pub use ids::CourierCode;
