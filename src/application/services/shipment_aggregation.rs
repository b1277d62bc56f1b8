//! # Shipment Aggregation Service
//!
//! Root component of the shipment core.
//!
//! Rate quotes and serviceability checks fan out to every selected
//! courier concurrently: one task per courier on a [`JoinSet`], each
//! taking a token from that courier's [`RateLimiter`](crate::infrastructure::rate_limit::RateLimiter)
//! before calling it. The service waits for every task, then merges
//! results and per-courier failures into one response. A failing or
//! throttled courier never aborts its siblings.
//!
//! Booking, tracking, cancellation and NDR calls target a single courier
//! and return the first error. A confirmed booking is then recorded in
//! the tracking store on a best-effort basis: the courier-side shipment
//! exists regardless, so a failed write is logged and not reported.
//!
//! # Examples
//!
//! ```ignore
//! use shipment_hub::application::services::{
//!     CourierRegistry, ShipmentAggregationService, TrackingService,
//! };
//!
//! let service = ShipmentAggregationService::new(registry, tracking);
//! let response = service.calculate_rates(&request).await?;
//! if !response.error.is_empty() {
//!     tracing::warn!(error = %response.error, "partial rate failure");
//! }
//! ```

use crate::application::dto::{
    AccountShipmentsResponse, AvailabilityRequest, CourierInfo, CourierListResponse, CourierRate,
    CreateShipmentRequest, MultiRateResponse, Pagination, ShipmentDetails, ShipmentResponse,
    TrackingRequest, TrackingResponse,
};
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::registry::{CourierRegistry, CourierStatus, RegisteredCourier};
use crate::application::services::tracking::TrackingService;
use crate::domain::entities::{RateRequest, ShipmentTracking};
use crate::domain::value_objects::{CourierCode, ShipmentStatus};
use crate::infrastructure::couriers::{
    CourierError, CourierProvider, CourierResult, NdrAction, NdrRecord,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, error, info, warn};
use uuid::Uuid;

/// Deadlines applied to courier calls.
///
/// Both are unset by default: a branch is then bounded only by its
/// adapter's HTTP timeout and a fan-out waits for its slowest courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationConfig {
    /// Deadline for a whole fan-out, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Deadline for each courier call, in milliseconds.
    pub per_courier_timeout_ms: Option<u64>,
}

impl AggregationConfig {
    /// Sets the fan-out deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the per-courier deadline.
    #[must_use]
    pub fn with_per_courier_timeout(mut self, timeout_ms: u64) -> Self {
        self.per_courier_timeout_ms = Some(timeout_ms);
        self
    }

    fn per_courier_timeout(&self) -> Option<Duration> {
        self.per_courier_timeout_ms.map(Duration::from_millis)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Results and failure messages collected from a fan-out.
type Collected<T> = (Vec<T>, Vec<String>);

/// Multi-courier aggregation service.
#[derive(Debug, Clone)]
pub struct ShipmentAggregationService {
    registry: Arc<CourierRegistry>,
    tracking: TrackingService,
    config: AggregationConfig,
}

impl ShipmentAggregationService {
    /// Creates a service with no deadlines.
    #[must_use]
    pub fn new(registry: Arc<CourierRegistry>, tracking: TrackingService) -> Self {
        Self {
            registry,
            tracking,
            config: AggregationConfig::default(),
        }
    }

    /// Sets the deadlines.
    #[must_use]
    pub fn with_config(mut self, config: AggregationConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the courier registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<CourierRegistry> {
        &self.registry
    }

    /// Returns the tracking service.
    #[inline]
    #[must_use]
    pub fn tracking(&self) -> &TrackingService {
        &self.tracking
    }

    /// Returns the deadlines.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Returns every registered courier with its remaining rate-limit tokens.
    #[must_use]
    pub fn registered_couriers(&self) -> Vec<CourierStatus> {
        self.registry.statuses()
    }

    /// Quotes rates from the requested couriers, or all when none are named.
    ///
    /// Unregistered codes are skipped. The response succeeds when any
    /// courier quoted or none failed; per-courier failures, including
    /// local rate-limit denials, are joined into `error`. Rate order is
    /// completion order.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` if the request is invalid;
    /// no courier is called then.
    #[tracing::instrument(
        name = "shipments.calculate_rates",
        skip_all,
        fields(request_id = %Uuid::new_v4())
    )]
    pub async fn calculate_rates(&self, request: &RateRequest) -> ApplicationResult<MultiRateResponse> {
        request.validate()?;
        let couriers = self.registry.select(&request.courier_codes);
        debug!(couriers = couriers.len(), "Fanning out rate request");

        let request = Arc::new(request.clone());
        let collected = self
            .fan_out("calculate_rate", couriers, move |provider| {
                let request = Arc::clone(&request);
                async move {
                    let info = provider.provider_info();
                    let quote = provider.calculate_rate(&request).await?;
                    Ok::<_, CourierError>(quote.map(|quote| CourierRate::from_quote(&info, quote)))
                }
            })
            .await;

        let (rates, errors) = collected;
        let response = MultiRateResponse::merge(rates, &errors);
        info!(
            success = response.success,
            rates = response.rates.len(),
            "Rate aggregation complete"
        );
        Ok(response)
    }

    /// Lists the couriers that can serve a route.
    ///
    /// Only couriers reporting the route serviceable without error are
    /// listed. The response succeeds only if no courier failed.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` if the request is invalid.
    #[tracing::instrument(
        name = "shipments.available_couriers",
        skip_all,
        fields(request_id = %Uuid::new_v4())
    )]
    pub async fn available_couriers(
        &self,
        request: &AvailabilityRequest,
    ) -> ApplicationResult<CourierListResponse> {
        request.validate()?;
        let couriers = self.registry.select(&request.courier_codes);

        let request = Arc::new(request.clone());
        let collected = self
            .fan_out("check_serviceability", couriers, move |provider| {
                let request = Arc::clone(&request);
                async move {
                    let serviceable = provider
                        .check_serviceability(
                            &request.origin_pincode,
                            &request.destination_pincode,
                            request.weight,
                        )
                        .await?;
                    Ok::<_, CourierError>(
                        serviceable.then(|| CourierInfo::from(provider.provider_info())),
                    )
                }
            })
            .await;

        let (couriers, errors) = collected;
        let response = CourierListResponse::merge(couriers, &errors);
        info!(
            success = response.success,
            couriers = response.couriers.len(),
            "Serviceability check complete"
        );
        Ok(response)
    }

    /// Books a shipment with the named courier and records it.
    ///
    /// The tracking write after a confirmed booking is best-effort: a
    /// failure is logged and the booking is still reported.
    ///
    /// # Errors
    ///
    /// - `Validation` for an invalid request (no courier is called)
    /// - `UnknownCourier` for an unregistered code
    /// - `DuplicateOrder` if the order was booked before, even if archived
    /// - `RateLimited` if the courier's bucket is empty
    /// - `Courier` if the courier fails or declines the booking
    #[tracing::instrument(
        name = "shipments.create_shipment",
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            courier = %request.courier_code,
            order_id = %request.shipment.order_number
        )
    )]
    pub async fn create_shipment(
        &self,
        request: &CreateShipmentRequest,
    ) -> ApplicationResult<ShipmentResponse> {
        if request.account_id.trim().is_empty() {
            return Err(ApplicationError::validation("account_id must not be empty"));
        }
        request.shipment.validate()?;
        let courier = self.registry.resolve(request.courier_code.as_str())?;

        let order_id = &request.shipment.order_number;
        if self.tracking.order_taken(order_id).await? {
            return Err(ApplicationError::duplicate_order(order_id));
        }

        let provider = Arc::clone(courier.provider());
        let booking = self
            .call_single(
                &courier,
                "create_shipment",
                provider.create_shipment(&request.shipment),
            )
            .await?;

        if !booking.success {
            let message = booking
                .error
                .clone()
                .unwrap_or_else(|| "booking declined".to_string());
            warn!(error = %message, "Courier declined booking");
            return Err(CourierError::rejected(message)
                .in_call(courier.code().as_str(), "create_shipment")
                .into());
        }

        let mut response = ShipmentResponse {
            success: true,
            tracking_id: booking.tracking_id.clone(),
            courier_awb: booking.awb_number.clone(),
            label: booking.label.clone(),
            courier_code: courier.code().to_string(),
            order_id: order_id.clone(),
            status: ShipmentStatus::Created.to_string(),
            error: String::new(),
        };

        match self
            .tracking
            .record_booking(&request.account_id, order_id, courier.code(), &booking)
            .await
        {
            Ok(tracking) => {
                info!(tracking_id = %tracking.tracking_id, awb = %tracking.awb_number, "Shipment created");
                response.tracking_id = tracking.tracking_id;
                response.courier_awb = tracking.awb_number;
            }
            Err(e) => {
                error!(
                    error = %e,
                    awb = %booking.awb_number,
                    "Shipment created with courier but tracking write failed"
                );
            }
        }

        Ok(response)
    }

    /// Fetches a shipment's scan history from its courier.
    ///
    /// The courier is taken from the stored shipment when one exists,
    /// otherwise from the request. With `refresh` set, returned scans are
    /// fed into the tracking store.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank tracking id, or no courier to ask
    /// - `UnknownCourier`, `RateLimited`, `Courier` as for booking
    /// - `Store` if the lookup or a refresh write fails
    #[tracing::instrument(
        name = "shipments.track_shipment",
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            tracking_id = %request.tracking_id
        )
    )]
    pub async fn track_shipment(
        &self,
        request: &TrackingRequest,
    ) -> ApplicationResult<TrackingResponse> {
        let (courier, stored) = self
            .resolve_for_tracking(&request.tracking_id, request.courier_code.as_ref())
            .await?;
        let reference = stored
            .as_ref()
            .map_or(request.tracking_id.as_str(), |s| s.awb_number.as_str())
            .to_string();

        let provider = Arc::clone(courier.provider());
        let events = self
            .call_single(&courier, "track_shipment", provider.track_shipment(&reference))
            .await?;

        let mut recorded_events = 0;
        if request.refresh {
            match &stored {
                Some(tracking) => {
                    recorded_events = self.tracking.ingest_events(tracking, &events).await?;
                    debug!(recorded_events, "Tracking refreshed");
                }
                None => debug!("No stored shipment, refresh skipped"),
            }
        }

        Ok(TrackingResponse {
            success: true,
            tracking_id: request.tracking_id.clone(),
            courier_code: courier.code().to_string(),
            events,
            recorded_events,
            error: String::new(),
        })
    }

    /// Cancels a shipment with its courier and records the cancellation.
    ///
    /// The courier is resolved as in [`Self::track_shipment`]. The status
    /// write is best-effort.
    ///
    /// # Errors
    ///
    /// Same as [`Self::track_shipment`].
    #[tracing::instrument(
        name = "shipments.cancel_shipment",
        skip_all,
        fields(
            request_id = %Uuid::new_v4(),
            tracking_id = %tracking_id
        )
    )]
    pub async fn cancel_shipment(
        &self,
        tracking_id: &str,
        courier_code: Option<&CourierCode>,
    ) -> ApplicationResult<ShipmentResponse> {
        let (courier, stored) = self.resolve_for_tracking(tracking_id, courier_code).await?;
        let reference = stored
            .as_ref()
            .map_or(tracking_id, |s| s.awb_number.as_str())
            .to_string();

        let provider = Arc::clone(courier.provider());
        self.call_single(&courier, "cancel_shipment", provider.cancel_shipment(&reference))
            .await?;

        let cancelled = ShipmentStatus::Cancelled.as_str();
        let mut response = match &stored {
            Some(tracking) => ShipmentResponse::from(tracking),
            None => ShipmentResponse {
                success: true,
                tracking_id: tracking_id.to_string(),
                courier_awb: reference,
                courier_code: courier.code().to_string(),
                ..ShipmentResponse::default()
            },
        };
        response.status = cancelled.to_string();

        if stored.is_some()
            && let Err(e) = self
                .tracking
                .update_status(tracking_id, cancelled, "", "Shipment cancelled")
                .await
        {
            error!(error = %e, "Shipment cancelled with courier but status write failed");
        }
        info!("Shipment cancelled");

        Ok(response)
    }

    /// Returns the shipment recorded for an order.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if the order has no live shipment.
    pub async fn get_shipment_by_order(&self, order_id: &str) -> ApplicationResult<ShipmentResponse> {
        self.tracking
            .find_by_order(order_id)
            .await?
            .map(|tracking| ShipmentResponse::from(&tracking))
            .ok_or_else(|| ApplicationError::not_found("shipment for order", order_id))
    }

    /// Returns a shipment and its events, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if no live shipment has this
    /// tracking id.
    pub async fn get_shipment_details(&self, tracking_id: &str) -> ApplicationResult<ShipmentDetails> {
        self.tracking.shipment_details(tracking_id).await
    }

    /// Archives a shipment. It disappears from every lookup and listing;
    /// the courier is not contacted.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if no live shipment has this
    /// tracking id.
    pub async fn archive_shipment(&self, tracking_id: &str) -> ApplicationResult<()> {
        if self.tracking.archive(tracking_id).await? {
            info!(tracking_id, "Shipment archived");
            Ok(())
        } else {
            Err(ApplicationError::not_found("shipment", tracking_id))
        }
    }

    /// Lists an account's shipments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` for out-of-range pagination.
    pub async fn get_account_shipments(
        &self,
        account_id: &str,
        page: u32,
        page_size: u32,
    ) -> ApplicationResult<AccountShipmentsResponse> {
        let pagination = Pagination::new(page, page_size)?;
        let page = self.tracking.account_shipments(account_id, pagination).await?;
        Ok(AccountShipmentsResponse {
            success: true,
            shipments: page.shipments.iter().map(ShipmentResponse::from).collect(),
            page: pagination.page,
            page_size: pagination.page_size,
            total: page.total,
            error: String::new(),
        })
    }

    /// Lists pending non-delivery reports at a courier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for out-of-range paging, otherwise as for
    /// booking. Couriers without NDR support fail with `Courier`.
    pub async fn ndr_list(
        &self,
        courier_code: &str,
        page: u32,
        limit: u32,
    ) -> ApplicationResult<Vec<NdrRecord>> {
        let pagination = Pagination::new(page, limit)?;
        let courier = self.registry.resolve(courier_code)?;
        let provider = Arc::clone(courier.provider());
        self.call_single(
            &courier,
            "ndr_list",
            provider.ndr_list(pagination.page, pagination.page_size),
        )
        .await
    }

    /// Submits non-delivery report actions to a courier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty action list, otherwise as for
    /// [`Self::ndr_list`].
    pub async fn update_ndr(&self, courier_code: &str, actions: &[NdrAction]) -> ApplicationResult<()> {
        if actions.is_empty() {
            return Err(ApplicationError::validation("at least one NDR action is required"));
        }
        let courier = self.registry.resolve(courier_code)?;
        let provider = Arc::clone(courier.provider());
        self.call_single(&courier, "update_ndr", provider.update_ndr(actions))
            .await?;
        info!(courier = %courier.code(), actions = actions.len(), "NDR actions submitted");
        Ok(())
    }

    /// Resolves the courier for a tracking id, preferring the stored one.
    async fn resolve_for_tracking(
        &self,
        tracking_id: &str,
        fallback: Option<&CourierCode>,
    ) -> ApplicationResult<(RegisteredCourier, Option<ShipmentTracking>)> {
        if tracking_id.trim().is_empty() {
            return Err(ApplicationError::validation("tracking_id must not be empty"));
        }
        let stored = self.tracking.find_by_tracking_id(tracking_id).await?;
        let code = match (&stored, fallback) {
            (Some(tracking), _) => tracking.courier_code.clone(),
            (None, Some(code)) => code.clone(),
            (None, None) => {
                return Err(ApplicationError::validation(
                    "courier_code is required for an unknown shipment",
                ));
            }
        };
        let courier = self.registry.resolve(code.as_str())?;
        Ok((courier, stored))
    }

    /// Runs one rate-limited courier call under the per-courier deadline.
    async fn call_single<T, Fut>(
        &self,
        courier: &RegisteredCourier,
        operation: &'static str,
        call: Fut,
    ) -> ApplicationResult<T>
    where
        Fut: Future<Output = CourierResult<T>>,
    {
        if let Err(e) = courier.acquire() {
            warn!(courier = %courier.code(), operation, "Rate limit exceeded");
            return Err(e);
        }
        with_deadline(
            self.config.per_courier_timeout(),
            courier.code(),
            operation,
            call,
        )
        .await
        .map_err(|e| {
            warn!(courier = %courier.code(), operation, error = %e, "Courier call failed");
            ApplicationError::from(e)
        })
    }

    /// Calls every courier concurrently and waits for all of them.
    ///
    /// `call` returning `Ok(None)` means the courier had nothing to
    /// contribute. When the fan-out deadline elapses the branches still
    /// running are aborted and reported as timeouts; results that already
    /// arrived are kept.
    async fn fan_out<T, F, Fut>(
        &self,
        operation: &'static str,
        couriers: Vec<RegisteredCourier>,
        call: F,
    ) -> Collected<T>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn CourierProvider>) -> Fut,
        Fut: Future<Output = CourierResult<Option<T>>> + Send + 'static,
    {
        let per_courier = self.config.per_courier_timeout();
        let deadline = self.config.timeout().map(|limit| (Instant::now() + limit, limit));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for courier in couriers {
            let code = courier.code().clone();
            let future = call(Arc::clone(courier.provider()));
            let span = debug_span!("courier_call", courier = %code, operation);
            let handle = tasks.spawn(
                async move {
                    courier.acquire().map_err(|e| e.to_string())?;
                    with_deadline(per_courier, courier.code(), operation, future)
                        .await
                        .map_err(|e| e.to_string())
                }
                .instrument(span),
            );
            pending.insert(handle.id(), code);
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();
        loop {
            let next = match deadline {
                Some((at, _)) => {
                    match tokio::time::timeout_at(at, tasks.join_next_with_id()).await {
                        Ok(next) => next,
                        Err(_) => break,
                    }
                }
                None => tasks.join_next_with_id().await,
            };
            let Some(joined) = next else { break };
            match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    match outcome {
                        Ok(Some(result)) => results.push(result),
                        Ok(None) => {}
                        Err(message) => {
                            warn!(operation, error = %message, "Courier branch failed");
                            errors.push(message);
                        }
                    }
                }
                Err(e) => {
                    let courier = pending
                        .remove(&e.id())
                        .map_or_else(|| "courier".to_string(), |code| code.to_string());
                    warn!(operation, courier = %courier, error = %e, "Courier task aborted");
                    errors.push(format!("{} {} task failed: {}", courier, operation, e));
                }
            }
        }

        if !pending.is_empty() {
            tasks.abort_all();
            let limit = deadline.map_or(0, |(_, limit)| limit.as_millis());
            warn!(
                operation,
                unfinished = pending.len(),
                timeout_ms = %limit,
                "Fan-out deadline elapsed"
            );
            let mut unfinished: Vec<CourierCode> = pending.into_values().collect();
            unfinished.sort();
            for code in unfinished {
                errors.push(
                    CourierError::timeout(format!("fan-out did not complete within {}ms", limit))
                        .in_call(code.as_str(), operation)
                        .to_string(),
                );
            }
        }
        (results, errors)
    }
}

/// Awaits `call`, failing with an attributed timeout once `limit` elapses.
async fn with_deadline<T, Fut>(
    limit: Option<Duration>,
    courier: &CourierCode,
    operation: &'static str,
    call: Fut,
) -> CourierResult<T>
where
    Fut: Future<Output = CourierResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(CourierError::timeout(format!(
                "no response within {}ms",
                limit.as_millis()
            ))
            .in_call(courier.as_str(), operation))
        }),
        None => call.await,
    }
}
