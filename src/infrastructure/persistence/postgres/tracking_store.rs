//! # PostgreSQL Tracking Store
//!
//! PostgreSQL implementation of [`TrackingStore`] using sqlx.
//!
//! Unique keys are enforced by named table constraints (see
//! `migrations/0001_create_shipment_tracking.sql`); violations are mapped
//! back to [`StoreError::Duplicate`] by constraint name.

use crate::domain::entities::{
    NewShipmentEvent, NewShipmentTracking, ShipmentEvent, ShipmentTracking,
};
use crate::domain::value_objects::CourierCode;
use crate::infrastructure::persistence::traits::{StoreError, StoreResult, TrackingStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const TRACKING_COLUMNS: &str = "id, account_id, order_id, tracking_id, awb_number, \
     courier_code, status, label, created_at, updated_at, deleted_at";

const EVENT_COLUMNS: &str =
    "id, shipment_tracking_id, status, location, description, timestamp, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TrackingRow {
    id: i64,
    account_id: String,
    order_id: String,
    tracking_id: String,
    awb_number: String,
    courier_code: String,
    status: String,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TrackingRow> for ShipmentTracking {
    fn from(row: TrackingRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            order_id: row.order_id,
            tracking_id: row.tracking_id,
            awb_number: row.awb_number,
            courier_code: CourierCode::new(row.courier_code),
            status: row.status,
            label: row.label,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    shipment_tracking_id: i64,
    status: String,
    location: String,
    description: String,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for ShipmentEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            shipment_tracking_id: row.shipment_tracking_id,
            status: row.status,
            location: row.location,
            description: row.description,
            timestamp: row.timestamp,
            created_at: row.created_at,
        }
    }
}

/// Maps a sqlx error, translating constraint violations.
fn map_error(e: sqlx::Error, tracking: Option<&NewShipmentTracking>) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let (field, value) = match (db_err.constraint(), tracking) {
                (Some("shipment_tracking_order_id_key"), Some(t)) => ("order_id", t.order_id.as_str()),
                (Some("shipment_tracking_tracking_id_key"), Some(t)) => {
                    ("tracking_id", t.tracking_id.as_str())
                }
                (Some("shipment_tracking_awb_number_key"), Some(t)) => {
                    ("awb_number", t.awb_number.as_str())
                }
                _ => ("key", ""),
            };
            StoreError::duplicate(field, value)
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::not_found("shipment tracking", db_err.message().to_string())
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::connection(e.to_string()),
        _ => StoreError::query(e.to_string()),
    }
}

/// PostgreSQL implementation of [`TrackingStore`].
///
/// # Examples
///
/// ```ignore
/// use shipment_hub::infrastructure::persistence::postgres::PostgresTrackingStore;
///
/// let store = PostgresTrackingStore::connect("postgres://localhost/shipments", 10).await?;
/// store.run_migrations().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTrackingStore {
    pool: PgPool,
}

impl PostgresTrackingStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Internal` if a migration fails.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::internal(e.to_string()))
    }

    async fn find_live(&self, column: &str, value: &str) -> StoreResult<Option<ShipmentTracking>> {
        let sql = format!(
            "SELECT {TRACKING_COLUMNS} FROM shipment_tracking \
             WHERE {column} = $1 AND deleted_at IS NULL"
        );
        let row: Option<TrackingRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error(e, None))?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl TrackingStore for PostgresTrackingStore {
    async fn create_tracking(
        &self,
        tracking: &NewShipmentTracking,
    ) -> StoreResult<ShipmentTracking> {
        let sql = format!(
            "INSERT INTO shipment_tracking \
             (account_id, order_id, tracking_id, awb_number, courier_code, status, label) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TRACKING_COLUMNS}"
        );
        let row: TrackingRow = sqlx::query_as(&sql)
            .bind(&tracking.account_id)
            .bind(&tracking.order_id)
            .bind(&tracking.tracking_id)
            .bind(&tracking.awb_number)
            .bind(tracking.courier_code.as_str())
            .bind(&tracking.status)
            .bind(&tracking.label)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(e, Some(tracking)))?;
        Ok(row.into())
    }

    async fn get_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> StoreResult<Option<ShipmentTracking>> {
        self.find_live("tracking_id", tracking_id).await
    }

    async fn get_by_order_id(&self, order_id: &str) -> StoreResult<Option<ShipmentTracking>> {
        self.find_live("order_id", order_id).await
    }

    async fn order_id_taken(&self, order_id: &str) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shipment_tracking WHERE order_id = $1)")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(e, None))
    }

    async fn update_status(&self, tracking_id: &str, status: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shipment_tracking
            SET status = $2, updated_at = NOW()
            WHERE tracking_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(tracking_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(e, None))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("shipment tracking", tracking_id));
        }
        Ok(())
    }

    async fn append_event(&self, event: &NewShipmentEvent) -> StoreResult<ShipmentEvent> {
        let sql = format!(
            "INSERT INTO shipment_events \
             (shipment_tracking_id, status, location, description, timestamp) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {EVENT_COLUMNS}"
        );
        let row: EventRow = sqlx::query_as(&sql)
            .bind(event.shipment_tracking_id)
            .bind(&event.status)
            .bind(&event.location)
            .bind(&event.description)
            .bind(event.timestamp)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match map_error(e, None) {
                StoreError::NotFound { entity, .. } => {
                    StoreError::not_found(entity, event.shipment_tracking_id.to_string())
                }
                other => other,
            })?;
        Ok(row.into())
    }

    async fn list_events(&self, shipment_tracking_id: i64) -> StoreResult<Vec<ShipmentEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM shipment_events \
             WHERE shipment_tracking_id = $1 \
             ORDER BY timestamp DESC, id DESC"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(shipment_tracking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error(e, None))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_account(
        &self,
        account_id: &str,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<ShipmentTracking>> {
        let sql = format!(
            "SELECT {TRACKING_COLUMNS} FROM shipment_tracking \
             WHERE account_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows: Vec<TrackingRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error(e, None))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_account(&self, account_id: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shipment_tracking WHERE account_id = $1 AND deleted_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_error(e, None))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn soft_delete(&self, tracking_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shipment_tracking
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE tracking_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(tracking_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_error(e, None))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_maps_to_entity() {
        let now = Utc::now();
        let row = TrackingRow {
            id: 7,
            account_id: "acc-1".to_string(),
            order_id: "O1".to_string(),
            tracking_id: "TRK1".to_string(),
            awb_number: "AWB1".to_string(),
            courier_code: "delhivery".to_string(),
            status: "CREATED".to_string(),
            label: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let tracking: ShipmentTracking = row.into();
        assert_eq!(tracking.courier_code.as_str(), CourierCode::DELHIVERY);
        assert!(!tracking.is_deleted());
    }

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(matches!(
            map_error(sqlx::Error::PoolTimedOut, None),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            map_error(sqlx::Error::RowNotFound, None),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn lookup_columns_are_indexed() {
        let migrations = [
            include_str!("../../../../migrations/0001_create_shipment_tracking.sql"),
            include_str!("../../../../migrations/0002_index_shipment_tracking.sql"),
        ]
        .concat();
        for column in ["account_id", "courier_code", "status"] {
            let statement = format!("ON shipment_tracking ({})", column);
            assert!(migrations.contains(&statement), "no index on {}", column);
        }
    }
}
