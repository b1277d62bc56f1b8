//! Scriptable in-process courier for service tests.

use crate::domain::entities::{RateRequest, ShipmentRequest};
use crate::infrastructure::couriers::{
    CourierError, CourierProvider, CourierResult, NdrAction, NdrRecord, ProviderInfo, RateQuote,
    ShipmentBooking, TrackingEvent,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub rate: AtomicUsize,
    pub serviceability: AtomicUsize,
    pub create: AtomicUsize,
    pub track: AtomicUsize,
    pub cancel: AtomicUsize,
    pub ndr: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        [
            &self.rate,
            &self.serviceability,
            &self.create,
            &self.track,
            &self.cancel,
            &self.ndr,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[derive(Debug)]
pub(crate) struct StubProvider {
    info: ProviderInfo,
    quote: Mutex<Option<RateQuote>>,
    serviceable: Mutex<bool>,
    events: Mutex<Vec<TrackingEvent>>,
    booking_error: Mutex<Option<String>>,
    failure: Mutex<Option<CourierError>>,
    delay: Mutex<Duration>,
    pub calls: Calls,
}

impl StubProvider {
    pub fn new(code: &str) -> Self {
        Self {
            info: ProviderInfo::new(code, code.to_lowercase(), format!("{} stub", code)),
            quote: Mutex::new(Some(RateQuote {
                base_charge: Decimal::from(100),
                fuel_surcharge: Decimal::from(10),
                total_charge: Decimal::from(110),
                expected_days: 2,
                ..RateQuote::default()
            })),
            serviceable: Mutex::new(true),
            events: Mutex::new(Vec::new()),
            booking_error: Mutex::new(None),
            failure: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            calls: Calls::default(),
        }
    }

    pub fn with_quote(self, quote: Option<RateQuote>) -> Self {
        *self.quote.lock() = quote;
        self
    }

    pub fn unserviceable(self) -> Self {
        *self.serviceable.lock() = false;
        self
    }

    pub fn with_events(self, events: Vec<TrackingEvent>) -> Self {
        *self.events.lock() = events;
        self
    }

    pub fn rejecting_bookings(self, message: &str) -> Self {
        *self.booking_error.lock() = Some(message.to_string());
        self
    }

    pub fn failing(self, error: CourierError) -> Self {
        *self.failure.lock() = Some(error);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = delay;
        self
    }

    async fn enter(&self, counter: &AtomicUsize, operation: &'static str) -> CourierResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().clone();
        match failure {
            Some(error) => Err(error.in_call(self.info.code.as_str(), operation)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CourierProvider for StubProvider {
    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }

    async fn calculate_rate(&self, _request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        self.enter(&self.calls.rate, "calculate_rate").await?;
        Ok(self.quote.lock().clone())
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        self.enter(&self.calls.create, "create_shipment").await?;
        let booking_error = self.booking_error.lock().clone();
        if let Some(message) = booking_error {
            return Ok(ShipmentBooking {
                success: false,
                error: Some(message),
                ..ShipmentBooking::default()
            });
        }
        let awb = format!("{}-{}", self.info.code, request.order_number);
        Ok(ShipmentBooking {
            success: true,
            order_id: request.order_number.clone(),
            tracking_id: awb.clone(),
            awb_number: awb.clone(),
            courier_name: self.info.name.clone(),
            label: format!("https://labels.test/{}", awb),
            ..ShipmentBooking::default()
        })
    }

    async fn track_shipment(&self, _tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        self.enter(&self.calls.track, "track_shipment").await?;
        Ok(self.events.lock().clone())
    }

    async fn check_serviceability(
        &self,
        _origin_pincode: &str,
        _destination_pincode: &str,
        _weight: f64,
    ) -> CourierResult<bool> {
        self.enter(&self.calls.serviceability, "check_serviceability")
            .await?;
        Ok(*self.serviceable.lock())
    }

    async fn cancel_shipment(&self, _tracking_id: &str) -> CourierResult<()> {
        self.enter(&self.calls.cancel, "cancel_shipment").await
    }

    async fn ndr_list(&self, _page: u32, _limit: u32) -> CourierResult<Vec<NdrRecord>> {
        self.enter(&self.calls.ndr, "ndr_list").await?;
        Ok(vec![NdrRecord {
            awb_number: format!("{}-NDR", self.info.code),
            event_date: "2024-05-01".to_string(),
            courier_remarks: "Consignee unavailable".to_string(),
            total_attempts: 1,
        }])
    }

    async fn update_ndr(&self, _actions: &[NdrAction]) -> CourierResult<()> {
        self.enter(&self.calls.ndr, "update_ndr").await
    }
}
