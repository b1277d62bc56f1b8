//! # REST Handlers
//!
//! Request handlers, shared state and the error-to-status mapping.

use crate::application::dto::{
    AccountShipmentsResponse, AvailabilityRequest, CourierListResponse, CreateShipmentRequest,
    DEFAULT_PAGE_SIZE, MultiRateResponse, ShipmentDetails, ShipmentResponse, TrackingRequest,
    TrackingResponse,
};
use crate::application::error::ApplicationError;
use crate::application::services::{CourierStatus, ShipmentAggregationService};
use crate::domain::entities::RateRequest;
use crate::domain::value_objects::CourierCode;
use crate::infrastructure::couriers::{CourierError, NdrAction, NdrRecord};
use crate::infrastructure::persistence::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default NDR page size.
pub const DEFAULT_NDR_LIMIT: u32 = 20;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The aggregation service behind every endpoint.
    pub service: Arc<ShipmentAggregationService>,
}

impl AppState {
    /// Creates state around a service.
    #[must_use]
    pub fn new(service: Arc<ShipmentAggregationService>) -> Self {
        Self { service }
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Registered couriers with their remaining tokens, sorted by code.
    pub couriers: Vec<CourierStatus>,
}

/// Query for tracking lookups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingQuery {
    /// Courier to ask when the shipment is not stored.
    pub courier_code: Option<CourierCode>,
    /// Record returned scans.
    #[serde(default)]
    pub refresh: bool,
}

/// Query for cancellation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelQuery {
    /// Courier to ask when the shipment is not stored.
    pub courier_code: Option<CourierCode>,
}

/// Pagination query for account listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    /// Page number, starting at 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Paging query for NDR listings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NdrQuery {
    /// Page number, starting at 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Records per page.
    #[serde(default = "default_ndr_limit")]
    pub limit: u32,
}

/// Body for NDR updates.
#[derive(Debug, Clone, Deserialize)]
pub struct NdrUpdateRequest {
    /// Actions to submit.
    pub actions: Vec<NdrAction>,
}

/// Response for NDR updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdrUpdateResponse {
    /// Always true; failures are returned as errors.
    pub success: bool,
    /// Number of actions submitted.
    pub submitted: usize,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_ndr_limit() -> u32 {
    DEFAULT_NDR_LIMIT
}

/// Maps an application error to its HTTP status.
#[must_use]
pub fn status_for(error: &ApplicationError) -> StatusCode {
    match error {
        ApplicationError::Validation(_) => StatusCode::BAD_REQUEST,
        ApplicationError::UnknownCourier(_) | ApplicationError::NotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        ApplicationError::DuplicateOrder(_) => StatusCode::CONFLICT,
        ApplicationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ApplicationError::Courier(e) if matches!(e.kind(), CourierError::Timeout { .. }) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ApplicationError::Courier(_) => StatusCode::BAD_GATEWAY,
        ApplicationError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        ApplicationError::Store(StoreError::Duplicate { .. }) => StatusCode::CONFLICT,
        ApplicationError::Store(_) | ApplicationError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type HandlerResult<T> = Result<Json<T>, ApplicationError>;

/// `GET /api/v1/health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        couriers: state.service.registered_couriers(),
    })
}

/// `POST /api/v1/rates`
pub async fn calculate_rates(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RateRequest>,
) -> HandlerResult<MultiRateResponse> {
    state.service.calculate_rates(&request).await.map(Json)
}

/// `POST /api/v1/couriers/available`
pub async fn available_couriers(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AvailabilityRequest>,
) -> HandlerResult<CourierListResponse> {
    state.service.available_couriers(&request).await.map(Json)
}

/// `POST /api/v1/shipments`
pub async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<ShipmentResponse>), ApplicationError> {
    let response = state.service.create_shipment(&request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /api/v1/shipments/{tracking_id}`
pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> HandlerResult<ShipmentDetails> {
    state
        .service
        .get_shipment_details(&tracking_id)
        .await
        .map(Json)
}

/// `GET /api/v1/shipments/{tracking_id}/tracking`
pub async fn track_shipment(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
    Query(query): Query<TrackingQuery>,
) -> HandlerResult<TrackingResponse> {
    let request = TrackingRequest {
        tracking_id,
        courier_code: query.courier_code,
        refresh: query.refresh,
    };
    state.service.track_shipment(&request).await.map(Json)
}

/// `DELETE /api/v1/shipments/{tracking_id}`
pub async fn archive_shipment(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<StatusCode, ApplicationError> {
    state.service.archive_shipment(&tracking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/shipments/{tracking_id}/cancel`
pub async fn cancel_shipment(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> HandlerResult<ShipmentResponse> {
    state
        .service
        .cancel_shipment(&tracking_id, query.courier_code.as_ref())
        .await
        .map(Json)
}

/// `GET /api/v1/orders/{order_id}/shipment`
pub async fn get_order_shipment(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> HandlerResult<ShipmentResponse> {
    state
        .service
        .get_shipment_by_order(&order_id)
        .await
        .map(Json)
}

/// `GET /api/v1/accounts/{account_id}/shipments`
pub async fn list_account_shipments(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult<AccountShipmentsResponse> {
    state
        .service
        .get_account_shipments(&account_id, params.page, params.page_size)
        .await
        .map(Json)
}

/// `GET /api/v1/couriers/{code}/ndr`
pub async fn list_ndr(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<NdrQuery>,
) -> HandlerResult<Vec<NdrRecord>> {
    state
        .service
        .ndr_list(&code, query.page, query.limit)
        .await
        .map(Json)
}

/// `POST /api/v1/couriers/{code}/ndr`
pub async fn update_ndr(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(request): Json<NdrUpdateRequest>,
) -> HandlerResult<NdrUpdateResponse> {
    state.service.update_ndr(&code, &request.actions).await?;
    Ok(Json(NdrUpdateResponse {
        success: true,
        submitted: request.actions.len(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (ApplicationError::validation("bad"), StatusCode::BAD_REQUEST),
            (ApplicationError::unknown_courier("FEDEX"), StatusCode::NOT_FOUND),
            (ApplicationError::not_found("shipment", "T1"), StatusCode::NOT_FOUND),
            (ApplicationError::duplicate_order("O1"), StatusCode::CONFLICT),
            (ApplicationError::rate_limited("XPRESSBEES"), StatusCode::TOO_MANY_REQUESTS),
            (
                CourierError::connection("reset").in_call("BLUEDART", "track_shipment").into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CourierError::timeout("no response within 50ms")
                    .in_call("DELHIVERY", "create_shipment")
                    .into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (StoreError::connection("down").into(), StatusCode::INTERNAL_SERVER_ERROR),
            (StoreError::duplicate("awb_number", "A1").into(), StatusCode::CONFLICT),
        ];
        for (error, status) in cases {
            assert_eq!(status_for(&error), status, "{}", error);
        }
    }

    #[test]
    fn pagination_defaults() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
    }
}
