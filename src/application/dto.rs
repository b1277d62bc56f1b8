//! # Data Transfer Objects
//!
//! Request and response shapes of the aggregation service.
//!
//! Fan-out responses ([`MultiRateResponse`], [`CourierListResponse`])
//! carry partial failures inline: `success` is the only machine-checkable
//! outcome and `error` is a `"; "`-joined list of per-courier failures,
//! which may be non-empty alongside results.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::{ShipmentEvent, ShipmentRequest, ShipmentTracking};
use crate::domain::value_objects::CourierCode;
use crate::infrastructure::couriers::{ProviderInfo, RateQuote, TrackingEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Separator between per-courier errors in fan-out responses.
pub const ERROR_SEPARATOR: &str = "; ";

/// One courier's rate in a [`MultiRateResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierRate {
    /// Courier code.
    pub courier_code: CourierCode,
    /// Courier display name.
    pub courier_name: String,
    /// Freight charge.
    pub base_charge: Decimal,
    /// Fuel surcharge.
    pub fuel_surcharge: Decimal,
    /// Cash-on-delivery charge.
    pub cod_charge: Decimal,
    /// Handling charge.
    pub handling_charge: Decimal,
    /// Provider-reported total.
    pub total_charge: Decimal,
    /// Expected transit time in days.
    pub expected_days: u32,
}

impl CourierRate {
    /// Builds a rate entry from a courier's quote. Charges are copied as-is.
    #[must_use]
    pub fn from_quote(info: &ProviderInfo, quote: RateQuote) -> Self {
        Self {
            courier_code: info.code.clone(),
            courier_name: info.name.clone(),
            base_charge: quote.base_charge,
            fuel_surcharge: quote.fuel_surcharge,
            cod_charge: quote.cod_charge,
            handling_charge: quote.handling_charge,
            total_charge: quote.total_charge,
            expected_days: quote.expected_days,
        }
    }
}

/// Result of a rate fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiRateResponse {
    /// True if at least one courier quoted, or no courier was asked.
    pub success: bool,
    /// Collected rates, in completion order.
    pub rates: Vec<CourierRate>,
    /// Joined per-courier errors; empty when none.
    pub error: String,
}

impl MultiRateResponse {
    /// Merges fan-out results.
    ///
    /// Succeeds when any rate was collected or nothing failed.
    #[must_use]
    pub fn merge(rates: Vec<CourierRate>, errors: &[String]) -> Self {
        Self {
            success: !rates.is_empty() || errors.is_empty(),
            rates,
            error: errors.join(ERROR_SEPARATOR),
        }
    }
}

/// Serviceability query for [`CourierListResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    /// Pickup pincode.
    pub origin_pincode: String,
    /// Delivery pincode.
    pub destination_pincode: String,
    /// Package weight in grams.
    pub weight: f64,
    /// Couriers to ask; empty means all registered.
    #[serde(default)]
    pub courier_codes: Vec<CourierCode>,
}

impl AvailabilityRequest {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for a blank pincode or a
    /// non-positive weight.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.origin_pincode.trim().is_empty() || self.destination_pincode.trim().is_empty() {
            return Err(ApplicationError::validation("pincodes must not be empty"));
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(ApplicationError::validation(
                "weight must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// A courier that can serve a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierInfo {
    /// Courier code.
    pub code: CourierCode,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
}

impl From<ProviderInfo> for CourierInfo {
    fn from(info: ProviderInfo) -> Self {
        Self {
            code: info.code,
            name: info.name,
            description: info.description,
        }
    }
}

/// Result of a serviceability fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourierListResponse {
    /// True only if no courier failed.
    pub success: bool,
    /// Couriers that reported the route serviceable.
    pub couriers: Vec<CourierInfo>,
    /// Joined per-courier errors; empty when none.
    pub error: String,
}

impl CourierListResponse {
    /// Merges fan-out results. An empty serviceable set alone is not a failure.
    #[must_use]
    pub fn merge(couriers: Vec<CourierInfo>, errors: &[String]) -> Self {
        Self {
            success: errors.is_empty(),
            couriers,
            error: errors.join(ERROR_SEPARATOR),
        }
    }
}

/// Booking request for a named courier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    /// Owning merchant account.
    pub account_id: String,
    /// Courier to book with.
    pub courier_code: CourierCode,
    /// Shipment details.
    pub shipment: ShipmentRequest,
}

/// A shipment as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipmentResponse {
    /// Whether the shipment exists.
    pub success: bool,
    /// Tracking identifier.
    pub tracking_id: String,
    /// Courier air waybill number.
    pub courier_awb: String,
    /// Shipping label reference.
    pub label: String,
    /// Courier code.
    pub courier_code: String,
    /// Caller's order number.
    pub order_id: String,
    /// Current status.
    pub status: String,
    /// Error message, empty on success.
    pub error: String,
}

impl From<&ShipmentTracking> for ShipmentResponse {
    fn from(tracking: &ShipmentTracking) -> Self {
        Self {
            success: true,
            tracking_id: tracking.tracking_id.clone(),
            courier_awb: tracking.awb_number.clone(),
            label: tracking.label.clone(),
            courier_code: tracking.courier_code.to_string(),
            order_id: tracking.order_id.clone(),
            status: tracking.status.clone(),
            error: String::new(),
        }
    }
}

/// Tracking query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackingRequest {
    /// Tracking identifier or AWB number.
    pub tracking_id: String,
    /// Courier to ask when no tracking row exists.
    #[serde(default)]
    pub courier_code: Option<CourierCode>,
    /// Feed the returned events into the tracking store.
    #[serde(default)]
    pub refresh: bool,
}

/// Courier scan history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackingResponse {
    /// Whether the courier answered.
    pub success: bool,
    /// Tracking identifier that was queried.
    pub tracking_id: String,
    /// Courier that answered.
    pub courier_code: String,
    /// Scans as reported by the courier.
    pub events: Vec<TrackingEvent>,
    /// Events written to the store during a refresh.
    pub recorded_events: usize,
    /// Error message, empty on success.
    pub error: String,
}

/// A tracking row with its history, newest event first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    /// The tracking row.
    pub shipment: ShipmentTracking,
    /// Its events, newest first.
    pub events: Vec<ShipmentEvent>,
}

/// 1-based pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: u32,
    /// Rows per page, 1 to [`MAX_PAGE_SIZE`].
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates validated pagination.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` if `page` is zero or
    /// `page_size` is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> ApplicationResult<Self> {
        if page == 0 {
            return Err(ApplicationError::validation("page must be at least 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ApplicationError::validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, page_size })
    }

    /// Returns the number of rows to skip.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of an account's shipments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountShipmentsResponse {
    /// Always true; failures are returned as errors.
    pub success: bool,
    /// Shipments on this page, newest first.
    pub shipments: Vec<ShipmentResponse>,
    /// Page number.
    pub page: u32,
    /// Page size.
    pub page_size: u32,
    /// Live shipments across all pages.
    pub total: u64,
    /// Error message, empty on success.
    pub error: String,
}
