//! # Shipment Tracking Entities
//!
//! Persisted shipment lifecycle state.
//!
//! A [`ShipmentTracking`] row is created exactly once, when a courier
//! confirms a booking, and afterwards only its denormalized `status` moves.
//! Its history lives in append-only [`ShipmentEvent`] rows. Tracking rows
//! are never hard-deleted; `deleted_at` marks a soft delete.

use crate::domain::value_objects::CourierCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted shipment tracking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentTracking {
    /// Surrogate key.
    pub id: i64,
    /// Owning merchant account.
    pub account_id: String,
    /// Caller-supplied order number (unique).
    pub order_id: String,
    /// Tracking identifier returned by the courier (unique).
    pub tracking_id: String,
    /// Air waybill number (unique).
    pub awb_number: String,
    /// Courier that carries the shipment.
    pub courier_code: CourierCode,
    /// Latest known status, projected from the newest event.
    pub status: String,
    /// Shipping label reference (URL or document id).
    pub label: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShipmentTracking {
    /// Returns true if the row has been soft-deleted.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Insert payload for a [`ShipmentTracking`] row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipmentTracking {
    /// Owning merchant account.
    pub account_id: String,
    /// Caller-supplied order number.
    pub order_id: String,
    /// Courier tracking identifier.
    pub tracking_id: String,
    /// Air waybill number.
    pub awb_number: String,
    /// Courier code.
    pub courier_code: CourierCode,
    /// Initial status.
    pub status: String,
    /// Shipping label reference.
    pub label: String,
}

/// A persisted tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentEvent {
    /// Surrogate key.
    pub id: i64,
    /// Owning tracking row.
    pub shipment_tracking_id: i64,
    /// Status reported with this event.
    pub status: String,
    /// Where the event happened.
    pub location: String,
    /// Free-text description.
    pub description: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

impl ShipmentEvent {
    /// Returns true if `candidate` describes the same occurrence.
    ///
    /// Two events are the same occurrence when status, location and
    /// timestamp (to the microsecond) all match.
    #[must_use]
    pub fn same_occurrence(&self, candidate: &NewShipmentEvent) -> bool {
        self.status == candidate.status
            && self.location == candidate.location
            && self.timestamp.timestamp_micros() == candidate.timestamp.timestamp_micros()
    }
}

/// Insert payload for a [`ShipmentEvent`] row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipmentEvent {
    /// Owning tracking row.
    pub shipment_tracking_id: i64,
    /// Reported status.
    pub status: String,
    /// Event location.
    pub location: String,
    /// Free-text description.
    pub description: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
}
