//! # Tracking Store Port
//!
//! Persistence abstraction for shipment tracking state.
//!
//! The store exclusively owns two tables: tracking rows (one per booked
//! shipment, unique on order id, tracking id and AWB number) and
//! append-only tracking events. Every read goes to the backing store;
//! there is no caching layer.
//!
//! # Examples
//!
//! ```ignore
//! use shipment_hub::infrastructure::persistence::traits::TrackingStore;
//!
//! async fn latest_status(store: &impl TrackingStore, tracking_id: &str) -> Option<String> {
//!     store.get_by_tracking_id(tracking_id).await.ok().flatten().map(|t| t.status)
//! }
//! ```

use crate::domain::entities::{
    NewShipmentEvent, NewShipmentTracking, ShipmentEvent, ShipmentTracking,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for tracking store operations.
///
/// Lookups report an absent row as `Ok(None)`; `NotFound` is reserved
/// for mutations that target a missing row.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A mutation targeted a missing row.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Type of entity.
        entity: &'static str,
        /// Lookup key.
        key: String,
    },

    /// A unique constraint was violated.
    #[error("duplicate {field}: {value}")]
    Duplicate {
        /// Column that must be unique.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// The store could not be reached.
    #[error("store connection error: {0}")]
    Connection(String),

    /// A query failed.
    #[error("store query error: {0}")]
    Query(String),

    /// Internal error.
    #[error("store internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            field,
            value: value.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a duplicate error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result type for tracking store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store for shipment tracking rows and their events.
///
/// Soft-deleted rows are invisible to every lookup and listing but still
/// hold their unique keys.
#[async_trait]
pub trait TrackingStore: Send + Sync + fmt::Debug {
    /// Inserts a tracking row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the order id, tracking id or AWB
    /// number is already taken.
    async fn create_tracking(&self, tracking: &NewShipmentTracking)
    -> StoreResult<ShipmentTracking>;

    /// Gets a tracking row by tracking id.
    async fn get_by_tracking_id(&self, tracking_id: &str)
    -> StoreResult<Option<ShipmentTracking>>;

    /// Gets a tracking row by order id.
    async fn get_by_order_id(&self, order_id: &str) -> StoreResult<Option<ShipmentTracking>>;

    /// Returns true if any row holds this order id, soft-deleted or not.
    async fn order_id_taken(&self, order_id: &str) -> StoreResult<bool>;

    /// Overwrites the status of a tracking row and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no live row has this tracking id.
    async fn update_status(&self, tracking_id: &str, status: &str) -> StoreResult<()>;

    /// Appends an event row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the owning tracking row does not
    /// exist.
    async fn append_event(&self, event: &NewShipmentEvent) -> StoreResult<ShipmentEvent>;

    /// Lists the events of a tracking row, newest first.
    async fn list_events(&self, shipment_tracking_id: i64) -> StoreResult<Vec<ShipmentEvent>>;

    /// Lists an account's tracking rows, newest first.
    async fn list_by_account(
        &self,
        account_id: &str,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<ShipmentTracking>>;

    /// Counts an account's live tracking rows.
    async fn count_by_account(&self, account_id: &str) -> StoreResult<u64>;

    /// Soft-deletes a tracking row.
    ///
    /// Returns `Ok(false)` if no live row has this tracking id.
    async fn soft_delete(&self, tracking_id: &str) -> StoreResult<bool>;
}
