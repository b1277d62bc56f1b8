//! # Domain Enums
//!
//! Enumeration types for shipment concepts.
//!
//! - [`PaymentMode`] - Cash on delivery or prepaid
//! - [`ShipmentStatus`] - Lifecycle statuses recorded by the tracking store
//!
//! All enums implement `Display`, `FromStr`, and Serde traits using their
//! upper-case wire names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment mode of a shipment.
///
/// # Examples
///
/// ```
/// use shipment_hub::domain::value_objects::PaymentMode;
///
/// let mode: PaymentMode = "cod".parse().unwrap();
/// assert!(mode.is_cod());
/// assert_eq!(mode.to_string(), "COD");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    /// Cash on delivery; the collectable amount is due from the consignee.
    #[serde(alias = "cod", alias = "Cod")]
    Cod,
    /// Paid up-front by the merchant.
    #[serde(alias = "prepaid", alias = "Prepaid")]
    Prepaid,
}

impl PaymentMode {
    /// Returns the upper-case wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Prepaid => "PREPAID",
        }
    }

    /// Returns true for cash on delivery.
    #[inline]
    #[must_use]
    pub const fn is_cod(self) -> bool {
        matches!(self, Self::Cod)
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COD" => Ok(Self::Cod),
            "PREPAID" => Ok(Self::Prepaid),
            _ => Err(ParseEnumError::InvalidValue("PaymentMode", s.to_string())),
        }
    }
}

/// Well-known shipment lifecycle statuses.
///
/// Courier-reported statuses are stored verbatim on tracking events; this
/// enum names the statuses the service itself writes or recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Booked with the courier, not yet picked up.
    Created,
    /// Awaiting courier action.
    Pending,
    /// Picked up from the warehouse.
    Pickup,
    /// Moving through the courier network.
    InTransit,
    /// With the delivery agent.
    OutForDelivery,
    /// Delivered to the consignee.
    Delivered,
    /// Delivery exception (NDR raised).
    Exception,
    /// Cancelled before delivery.
    Cancelled,
    /// Returning to origin.
    Rto,
}

impl ShipmentStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Pickup => "PICKUP",
            Self::InTransit => "IN_TRANSIT",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Exception => "EXCEPTION",
            Self::Cancelled => "CANCELLED",
            Self::Rto => "RTO",
        }
    }

    /// Returns true if no further status changes are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Rto)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "CREATED" => Ok(Self::Created),
            "PENDING" => Ok(Self::Pending),
            "PICKUP" | "PICKED_UP" => Ok(Self::Pickup),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "OUT_FOR_DELIVERY" => Ok(Self::OutForDelivery),
            "DELIVERED" => Ok(Self::Delivered),
            "EXCEPTION" => Ok(Self::Exception),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            "RTO" => Ok(Self::Rto),
            _ => Err(ParseEnumError::InvalidValue("ShipmentStatus", s.to_string())),
        }
    }
}

/// Error returned when parsing an enum from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {} value: '{}'", enum_name, value)
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}
