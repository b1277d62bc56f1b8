//! # Courier Provider Trait
//!
//! Port definition for courier integrations.
//!
//! Every integrated courier implements [`CourierProvider`], translating the
//! uniform request and response shapes into its own wire protocol and
//! managing its own authentication. Callers never see auth tokens.
//!
//! # Examples
//!
//! ```ignore
//! use shipment_hub::infrastructure::couriers::traits::CourierProvider;
//!
//! struct MyCourier { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl CourierProvider for MyCourier {
//!     // ... implement required methods
//! }
//! ```

use crate::domain::entities::{RateRequest, ShipmentRequest};
use crate::domain::value_objects::CourierCode;
use crate::infrastructure::couriers::error::{CourierError, CourierResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static description of a courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Registry code.
    pub code: CourierCode,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
}

impl ProviderInfo {
    /// Creates provider info.
    #[must_use]
    pub fn new(code: &str, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: CourierCode::new(code),
            name: name.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// A courier's price quote.
///
/// The total is provider-reported and is never recomputed from the
/// component charges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateQuote {
    /// Freight charge.
    pub base_charge: Decimal,
    /// Fuel surcharge.
    pub fuel_surcharge: Decimal,
    /// Cash-on-delivery charge.
    pub cod_charge: Decimal,
    /// Handling charge.
    pub handling_charge: Decimal,
    /// Total charge as reported by the courier.
    pub total_charge: Decimal,
    /// Expected transit time in days.
    pub expected_days: u32,
}

/// Outcome of a shipment booking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipmentBooking {
    /// Whether the courier accepted the booking.
    pub success: bool,
    /// Courier-side order id.
    pub order_id: String,
    /// Courier-side shipment id.
    pub shipment_id: String,
    /// Tracking identifier.
    pub tracking_id: String,
    /// Air waybill number.
    pub awb_number: String,
    /// Courier display name (may name a sub-carrier).
    pub courier_name: String,
    /// Shipping label reference.
    pub label: String,
    /// Courier-reported message when the booking failed.
    pub error: Option<String>,
}

/// A single tracking scan reported by a courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Status as reported by the courier.
    pub status: String,
    /// Scan location.
    pub location: String,
    /// When the scan happened, if the courier's timestamp could be parsed.
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text description.
    pub description: String,
}

impl TrackingEvent {
    /// Parses a courier timestamp.
    ///
    /// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS`,
    /// `YYYY-MM-DDTHH:MM:SS` and `DD-MM-YYYY HH:MM` layouts, which are
    /// read as UTC. Returns `None` for anything else.
    #[must_use]
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%d-%m-%Y %H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}

/// A pending non-delivery report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdrRecord {
    /// Air waybill number.
    pub awb_number: String,
    /// When the failed attempt happened.
    pub event_date: String,
    /// Courier remarks.
    pub courier_remarks: String,
    /// Delivery attempts so far.
    pub total_attempts: u32,
}

/// Action to take on a non-delivery report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdrActionType {
    /// Re-attempt delivery.
    ReAttempt,
    /// Change the delivery address.
    ChangeAddress,
    /// Change the consignee phone.
    ChangePhone,
    /// Return to origin.
    Rto,
}

/// An NDR action request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdrAction {
    /// Air waybill number.
    pub awb_number: String,
    /// Requested action.
    pub action: NdrActionType,
    /// Action-specific data (new address, phone, remarks).
    #[serde(default)]
    pub action_data: std::collections::BTreeMap<String, String>,
}

/// Trait defining the interface for courier adapters.
///
/// # Errors
///
/// Methods return [`CourierResult`]. Transport, decode and business
/// failures are wrapped with [`CourierError::in_call`] so they name the
/// courier and operation. "No data" is not an error: an unserviceable
/// route returns `Ok(false)`, a missing quote `Ok(None)` and an empty
/// history `Ok(vec![])`.
#[async_trait]
pub trait CourierProvider: Send + Sync + fmt::Debug {
    /// Returns the courier's code, name and description.
    fn provider_info(&self) -> ProviderInfo;

    /// Quotes a shipping rate.
    ///
    /// Returns `Ok(None)` when the courier offers no service option for
    /// the request.
    async fn calculate_rate(&self, request: &RateRequest) -> CourierResult<Option<RateQuote>>;

    /// Books a shipment.
    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking>;

    /// Fetches the scan history of a shipment.
    async fn track_shipment(&self, tracking_id: &str) -> CourierResult<Vec<TrackingEvent>>;

    /// Checks whether the courier delivers between two pincodes.
    async fn check_serviceability(
        &self,
        origin_pincode: &str,
        destination_pincode: &str,
        weight: f64,
    ) -> CourierResult<bool>;

    /// Cancels a booked shipment.
    async fn cancel_shipment(&self, tracking_id: &str) -> CourierResult<()>;

    /// Lists pending non-delivery reports.
    ///
    /// Couriers without NDR support keep the default, which fails with
    /// [`CourierError::Unsupported`].
    async fn ndr_list(&self, _page: u32, _limit: u32) -> CourierResult<Vec<NdrRecord>> {
        Err(CourierError::unsupported("ndr_list").in_call(self.provider_info().code, "ndr_list"))
    }

    /// Submits actions for non-delivery reports.
    async fn update_ndr(&self, _actions: &[NdrAction]) -> CourierResult<()> {
        Err(CourierError::unsupported("update_ndr")
            .in_call(self.provider_info().code, "update_ndr"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn provider_info_normalizes_code() {
        let info = ProviderInfo::new("xpressbees", "Xpressbees", "Xpressbees Shipping Services");
        assert_eq!(info.code.as_str(), "XPRESSBEES");
        assert_eq!(info.to_string(), "Xpressbees (XPRESSBEES)");
    }

    #[test]
    fn parses_supported_timestamp_layouts() {
        let rfc = TrackingEvent::parse_timestamp("2024-05-01T10:30:00+05:30").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-05-01T05:00:00+00:00");

        let naive = TrackingEvent::parse_timestamp("2024-05-01 10:30:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-05-01T10:30:00+00:00");

        assert!(TrackingEvent::parse_timestamp("01-05-2024 10:30").is_some());
        assert!(TrackingEvent::parse_timestamp("yesterday").is_none());
        assert!(TrackingEvent::parse_timestamp("").is_none());
    }

    #[test]
    fn ndr_action_serializes_snake_case() {
        let action = NdrAction {
            awb_number: "XB123".to_string(),
            action: NdrActionType::ReAttempt,
            action_data: Default::default(),
        };
        let json = serde_json::to_value(&action).unwrap_or_default();
        assert_eq!(json["action"], "re_attempt");
    }
}
