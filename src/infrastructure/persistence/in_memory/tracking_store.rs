//! # In-Memory Tracking Store
//!
//! In-memory implementation of [`TrackingStore`] for tests and local runs.
//!
//! Mirrors the PostgreSQL schema: surrogate ids are assigned in insert
//! order, unique keys include soft-deleted rows, and listings are ordered
//! newest first with the id as tie-breaker.

use crate::domain::entities::{
    NewShipmentEvent, NewShipmentTracking, ShipmentEvent, ShipmentTracking,
};
use crate::infrastructure::persistence::traits::{StoreError, StoreResult, TrackingStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    trackings: Vec<ShipmentTracking>,
    events: Vec<ShipmentEvent>,
    next_tracking_id: i64,
    next_event_id: i64,
}

impl State {
    fn live(&self) -> impl Iterator<Item = &ShipmentTracking> {
        self.trackings.iter().filter(|t| !t.is_deleted())
    }

    fn live_mut(&mut self, tracking_id: &str) -> Option<&mut ShipmentTracking> {
        self.trackings
            .iter_mut()
            .find(|t| !t.is_deleted() && t.tracking_id == tracking_id)
    }
}

/// In-memory implementation of [`TrackingStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrackingStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTrackingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracking rows, including soft-deleted ones.
    pub async fn tracking_count(&self) -> usize {
        self.state.read().await.trackings.len()
    }

    /// Returns the number of event rows.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn create_tracking(
        &self,
        tracking: &NewShipmentTracking,
    ) -> StoreResult<ShipmentTracking> {
        let mut state = self.state.write().await;

        for existing in &state.trackings {
            if existing.order_id == tracking.order_id {
                return Err(StoreError::duplicate("order_id", &tracking.order_id));
            }
            if existing.tracking_id == tracking.tracking_id {
                return Err(StoreError::duplicate("tracking_id", &tracking.tracking_id));
            }
            if existing.awb_number == tracking.awb_number {
                return Err(StoreError::duplicate("awb_number", &tracking.awb_number));
            }
        }

        state.next_tracking_id += 1;
        let now = Utc::now();
        let row = ShipmentTracking {
            id: state.next_tracking_id,
            account_id: tracking.account_id.clone(),
            order_id: tracking.order_id.clone(),
            tracking_id: tracking.tracking_id.clone(),
            awb_number: tracking.awb_number.clone(),
            courier_code: tracking.courier_code.clone(),
            status: tracking.status.clone(),
            label: tracking.label.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.trackings.push(row.clone());
        Ok(row)
    }

    async fn get_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> StoreResult<Option<ShipmentTracking>> {
        let state = self.state.read().await;
        Ok(state.live().find(|t| t.tracking_id == tracking_id).cloned())
    }

    async fn get_by_order_id(&self, order_id: &str) -> StoreResult<Option<ShipmentTracking>> {
        let state = self.state.read().await;
        Ok(state.live().find(|t| t.order_id == order_id).cloned())
    }

    async fn order_id_taken(&self, order_id: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.trackings.iter().any(|t| t.order_id == order_id))
    }

    async fn update_status(&self, tracking_id: &str, status: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let row = state
            .live_mut(tracking_id)
            .ok_or_else(|| StoreError::not_found("shipment tracking", tracking_id))?;
        row.status = status.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn append_event(&self, event: &NewShipmentEvent) -> StoreResult<ShipmentEvent> {
        let mut state = self.state.write().await;
        if !state
            .trackings
            .iter()
            .any(|t| t.id == event.shipment_tracking_id)
        {
            return Err(StoreError::not_found(
                "shipment tracking",
                event.shipment_tracking_id.to_string(),
            ));
        }

        state.next_event_id += 1;
        let row = ShipmentEvent {
            id: state.next_event_id,
            shipment_tracking_id: event.shipment_tracking_id,
            status: event.status.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            timestamp: event.timestamp,
            created_at: Utc::now(),
        };
        state.events.push(row.clone());
        Ok(row)
    }

    async fn list_events(&self, shipment_tracking_id: i64) -> StoreResult<Vec<ShipmentEvent>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.shipment_tracking_id == shipment_tracking_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn list_by_account(
        &self,
        account_id: &str,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<ShipmentTracking>> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .live()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_account(&self, account_id: &str) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.live().filter(|t| t.account_id == account_id).count() as u64)
    }

    async fn soft_delete(&self, tracking_id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.live_mut(tracking_id) {
            Some(row) => {
                let now = Utc::now();
                row.deleted_at = Some(now);
                row.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
