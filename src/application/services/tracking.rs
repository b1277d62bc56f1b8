//! # Tracking Service
//!
//! Orchestrates the tracking store on behalf of the aggregation service.
//!
//! A booking is recorded as one tracking row plus an initial `CREATED`
//! event. Courier scans fetched during a refresh are appended as events
//! and the row's status is moved to the latest one. Whether re-polled
//! scans are appended again is governed by [`TrackingEventPolicy`].

use crate::application::dto::{Pagination, ShipmentDetails};
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::{
    NewShipmentEvent, NewShipmentTracking, ShipmentEvent, ShipmentTracking,
};
use crate::domain::value_objects::{CourierCode, ShipmentStatus};
use crate::infrastructure::couriers::{ShipmentBooking, TrackingEvent};
use crate::infrastructure::persistence::TrackingStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Description of the event written when a booking is recorded.
pub const CREATED_DESCRIPTION: &str = "Shipment created successfully";

/// How courier scans are ingested on refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEventPolicy {
    /// Append every returned scan, even if already stored.
    #[default]
    Append,
    /// Skip scans whose status, location and timestamp are already stored.
    #[serde(alias = "dedupe")]
    Deduplicate,
}

impl fmt::Display for TrackingEventPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Deduplicate => f.write_str("deduplicate"),
        }
    }
}

impl FromStr for TrackingEventPolicy {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "dedupe" | "deduplicate" => Ok(Self::Deduplicate),
            other => Err(ApplicationError::configuration(format!(
                "unknown tracking event policy: {}",
                other
            ))),
        }
    }
}

/// A page of tracking rows with the account total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentPage {
    /// Rows on this page, newest first.
    pub shipments: Vec<ShipmentTracking>,
    /// Live rows across all pages.
    pub total: u64,
}

/// Tracking store orchestration.
#[derive(Debug, Clone)]
pub struct TrackingService {
    store: Arc<dyn TrackingStore>,
    policy: TrackingEventPolicy,
}

impl TrackingService {
    /// Creates a service appending every scan.
    #[must_use]
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self {
            store,
            policy: TrackingEventPolicy::default(),
        }
    }

    /// Sets the ingestion policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TrackingEventPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the ingestion policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> TrackingEventPolicy {
        self.policy
    }

    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TrackingStore> {
        &self.store
    }

    /// Records a confirmed booking: one tracking row and one `CREATED` event.
    ///
    /// A booking missing either identifier reuses the other.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if either write fails.
    pub async fn record_booking(
        &self,
        account_id: &str,
        order_id: &str,
        courier: &CourierCode,
        booking: &ShipmentBooking,
    ) -> ApplicationResult<ShipmentTracking> {
        let tracking_id = if booking.tracking_id.is_empty() {
            booking.awb_number.clone()
        } else {
            booking.tracking_id.clone()
        };
        let awb_number = if booking.awb_number.is_empty() {
            tracking_id.clone()
        } else {
            booking.awb_number.clone()
        };
        let created = ShipmentStatus::Created.as_str();

        let tracking = self
            .store
            .create_tracking(&NewShipmentTracking {
                account_id: account_id.to_string(),
                order_id: order_id.to_string(),
                tracking_id,
                awb_number,
                courier_code: courier.clone(),
                status: created.to_string(),
                label: booking.label.clone(),
            })
            .await?;

        self.store
            .append_event(&NewShipmentEvent {
                shipment_tracking_id: tracking.id,
                status: created.to_string(),
                location: String::new(),
                description: CREATED_DESCRIPTION.to_string(),
                timestamp: Utc::now(),
            })
            .await?;

        Ok(tracking)
    }

    /// Moves a shipment to `status` and appends a matching event.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if no live row has this
    /// tracking id.
    pub async fn update_status(
        &self,
        tracking_id: &str,
        status: &str,
        location: &str,
        description: &str,
    ) -> ApplicationResult<ShipmentEvent> {
        let tracking = self.require(tracking_id).await?;
        self.store.update_status(tracking_id, status).await?;
        let event = self
            .store
            .append_event(&NewShipmentEvent {
                shipment_tracking_id: tracking.id,
                status: status.to_string(),
                location: location.to_string(),
                description: description.to_string(),
                timestamp: Utc::now(),
            })
            .await?;
        Ok(event)
    }

    /// Appends courier scans to a shipment's history.
    ///
    /// Scans without a parseable timestamp are stamped with the current
    /// time. Under [`TrackingEventPolicy::Deduplicate`] such scans match a
    /// stored event on status and location alone. The row's status moves
    /// to the latest scan, preferring later timestamps and then later
    /// list positions. Returns the number of events written.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if a write fails.
    pub async fn ingest_events(
        &self,
        tracking: &ShipmentTracking,
        events: &[TrackingEvent],
    ) -> ApplicationResult<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut stored = match self.policy {
            TrackingEventPolicy::Append => Vec::new(),
            TrackingEventPolicy::Deduplicate => self.store.list_events(tracking.id).await?,
        };

        let mut written = 0;
        for event in events {
            let candidate = NewShipmentEvent {
                shipment_tracking_id: tracking.id,
                status: event.status.clone(),
                location: event.location.clone(),
                description: event.description.clone(),
                timestamp: event.timestamp.unwrap_or_else(Utc::now),
            };

            if self.policy == TrackingEventPolicy::Deduplicate {
                let seen = stored.iter().any(|existing| match event.timestamp {
                    Some(_) => existing.same_occurrence(&candidate),
                    None => {
                        existing.status == candidate.status
                            && existing.location == candidate.location
                    }
                });
                if seen {
                    debug!(
                        tracking_id = %tracking.tracking_id,
                        status = %event.status,
                        "Skipping already recorded event"
                    );
                    continue;
                }
            }

            let row = self.store.append_event(&candidate).await?;
            stored.push(row);
            written += 1;
        }

        let latest = events
            .iter()
            .enumerate()
            .max_by_key(|(index, event)| (event.timestamp, *index))
            .map(|(_, event)| event.status.as_str());
        if let Some(status) = latest
            && status != tracking.status
        {
            self.store.update_status(&tracking.tracking_id, status).await?;
        }

        Ok(written)
    }

    /// Finds a live shipment by tracking id.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if the lookup fails.
    pub async fn find_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> ApplicationResult<Option<ShipmentTracking>> {
        Ok(self.store.get_by_tracking_id(tracking_id).await?)
    }

    /// Finds a live shipment by order id.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if the lookup fails.
    pub async fn find_by_order(&self, order_id: &str) -> ApplicationResult<Option<ShipmentTracking>> {
        Ok(self.store.get_by_order_id(order_id).await?)
    }

    /// Returns true if the order id was ever booked, including archived
    /// shipments.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if the lookup fails.
    pub async fn order_taken(&self, order_id: &str) -> ApplicationResult<bool> {
        Ok(self.store.order_id_taken(order_id).await?)
    }

    /// Returns a shipment with its events, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if no live row has this
    /// tracking id.
    pub async fn shipment_details(&self, tracking_id: &str) -> ApplicationResult<ShipmentDetails> {
        let shipment = self.require(tracking_id).await?;
        let events = self.store.list_events(shipment.id).await?;
        Ok(ShipmentDetails { shipment, events })
    }

    /// Lists an account's shipments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if the query fails.
    pub async fn account_shipments(
        &self,
        account_id: &str,
        pagination: Pagination,
    ) -> ApplicationResult<ShipmentPage> {
        let shipments = self
            .store
            .list_by_account(account_id, pagination.page_size, pagination.offset())
            .await?;
        let total = self.store.count_by_account(account_id).await?;
        Ok(ShipmentPage { shipments, total })
    }

    /// Soft-deletes a shipment. Returns false if it was not live.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Store` if the update fails.
    pub async fn archive(&self, tracking_id: &str) -> ApplicationResult<bool> {
        Ok(self.store.soft_delete(tracking_id).await?)
    }

    async fn require(&self, tracking_id: &str) -> ApplicationResult<ShipmentTracking> {
        self.store
            .get_by_tracking_id(tracking_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("shipment", tracking_id))
    }
}
