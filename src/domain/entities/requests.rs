//! # Courier Requests
//!
//! Courier-agnostic request shapes handed to every provider adapter.
//!
//! Both requests carry a `validate` method that enforces the invariants
//! shared by all couriers (positive weight and dimensions, mandatory
//! address fields). Adapters may reject further on their own rules.

use crate::domain::entities::address::{Address, OrderItem};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{CourierCode, PaymentMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters for a shipping rate quote.
///
/// Weight is in grams, dimensions in centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequest {
    /// Pickup pincode.
    pub origin_pincode: String,
    /// Delivery pincode.
    pub destination_pincode: String,
    /// Package weight in grams.
    pub weight: f64,
    /// Package length in centimetres.
    pub length: f64,
    /// Package width in centimetres.
    pub width: f64,
    /// Package height in centimetres.
    pub height: f64,
    /// Payment mode.
    pub payment_mode: PaymentMode,
    /// Amount to collect on delivery.
    #[serde(default)]
    pub collectable_amount: Decimal,
    /// Restricts the quote to these couriers; empty means all.
    #[serde(default)]
    pub courier_codes: Vec<CourierCode>,
}

impl RateRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidField` for a blank pincode, a
    /// non-positive weight or dimension, or a negative collectable amount.
    pub fn validate(&self) -> DomainResult<()> {
        require_pincode("origin_pincode", &self.origin_pincode)?;
        require_pincode("destination_pincode", &self.destination_pincode)?;
        require_positive("weight", self.weight)?;
        require_positive("length", self.length)?;
        require_positive("width", self.width)?;
        require_positive("height", self.height)?;
        if self.collectable_amount.is_sign_negative() {
            return Err(DomainError::invalid_field(
                "collectable_amount",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Parameters for booking a shipment with a courier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// Caller-supplied order number, unique per account.
    pub order_number: String,
    /// Payment type.
    pub payment_type: PaymentMode,
    /// Package weight in grams.
    pub package_weight: f64,
    /// Package length in centimetres.
    pub package_length: f64,
    /// Package breadth in centimetres.
    pub package_breadth: f64,
    /// Package height in centimetres.
    pub package_height: f64,
    /// Invoice value of the order.
    pub order_amount: Decimal,
    /// Amount to collect on delivery.
    #[serde(default)]
    pub collectable_amount: Decimal,
    /// Delivery address.
    pub consignee: Address,
    /// Pickup (warehouse) address.
    pub pickup: Address,
    /// Line items.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Ask the courier to schedule pickup automatically.
    #[serde(default)]
    pub auto_pickup: bool,
    /// Return-to-origin address when it differs from the pickup address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rto_address: Option<Address>,
}

impl ShipmentRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidField` for a blank order number, a
    /// non-positive package weight or dimension, an incomplete consignee,
    /// pickup or RTO address, or an empty item list.
    pub fn validate(&self) -> DomainResult<()> {
        if self.order_number.trim().is_empty() {
            return Err(DomainError::invalid_field("order_number", "must not be empty"));
        }
        require_positive("package_weight", self.package_weight)?;
        require_positive("package_length", self.package_length)?;
        require_positive("package_breadth", self.package_breadth)?;
        require_positive("package_height", self.package_height)?;
        if self.order_amount.is_sign_negative() || self.collectable_amount.is_sign_negative() {
            return Err(DomainError::invalid_field(
                "order_amount",
                "amounts must not be negative",
            ));
        }
        require_address("consignee", &self.consignee)?;
        require_address("pickup", &self.pickup)?;
        if let Some(rto) = &self.rto_address {
            require_address("rto_address", rto)?;
        }
        if self.items.is_empty() {
            return Err(DomainError::invalid_field("items", "at least one item is required"));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(DomainError::invalid_field("items", "quantity must be positive"));
        }
        Ok(())
    }

    /// Returns the return-to-origin address, defaulting to pickup.
    #[must_use]
    pub fn return_address(&self) -> &Address {
        self.rto_address.as_ref().unwrap_or(&self.pickup)
    }
}

fn require_positive(field: &'static str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DomainError::invalid_field(field, "must be greater than zero"))
    }
}

fn require_pincode(field: &'static str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::invalid_field(field, "must not be empty"))
    } else {
        Ok(())
    }
}

fn require_address(field: &'static str, address: &Address) -> DomainResult<()> {
    let missing = address.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DomainError::invalid_field(
            field,
            format!("missing {}", missing.join(", ")),
        ))
    }
}
