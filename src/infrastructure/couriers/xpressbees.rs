//! # Xpressbees Adapter
//!
//! JSON REST integration with bearer-token sessions.
//!
//! The adapter logs in with the configured email and password on first
//! use and caches the returned token for 23 hours. A 401/403 on any call
//! drops the cached token; the failing call is not retried.
//!
//! # Endpoints
//!
//! | Operation | Endpoint |
//! | --- | --- |
//! | login | `POST /users/login` |
//! | rate, serviceability | `POST /courier/serviceability` |
//! | create | `POST /shipments2` |
//! | track | `GET /shipments2/track/{awb}` |
//! | cancel | `POST /shipments2/cancel` |
//! | NDR list | `GET /ndr` |
//! | NDR update | `POST /ndr/create` |

use crate::domain::entities::{Address, RateRequest, ShipmentRequest};
use crate::domain::value_objects::{CourierCode, PaymentMode};
use crate::infrastructure::couriers::auth::TokenCache;
use crate::infrastructure::couriers::error::{CourierError, CourierResult};
use crate::infrastructure::couriers::http_client::HttpClient;
use crate::infrastructure::couriers::settings::{CourierCredentials, CourierSettings};
use crate::infrastructure::couriers::traits::{
    CourierProvider, NdrAction, NdrActionType, NdrRecord, ProviderInfo, RateQuote,
    ShipmentBooking, TrackingEvent,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://shipment.xpressbees.com/api";

/// Session token lifetime.
const TOKEN_LIFETIME: Duration = Duration::from_secs(23 * 60 * 60);

/// Transit estimate; the serviceability API reports none.
const DEFAULT_EXPECTED_DAYS: u32 = 2;

/// Xpressbees courier adapter.
#[derive(Debug)]
pub struct XpressbeesProvider {
    client: HttpClient,
    credentials: CourierCredentials,
    tokens: TokenCache,
}

impl XpressbeesProvider {
    /// Creates the adapter. No network call is made until first use.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::InvalidRequest` if the email or password is
    /// missing, or `CourierError::Internal` if the HTTP client cannot be
    /// built.
    pub fn new(settings: &CourierSettings) -> CourierResult<Self> {
        if !settings.credentials().is_complete() {
            return Err(CourierError::invalid_request(
                "email (api key) and password (api secret) are required",
            ));
        }
        Ok(Self {
            client: HttpClient::new(settings.base_url(), settings.timeout_ms())?,
            credentials: settings.credentials().clone(),
            tokens: TokenCache::new(TOKEN_LIFETIME),
        })
    }

    async fn login(&self) -> CourierResult<String> {
        debug!(courier = CourierCode::XPRESSBEES, "Authenticating");
        let body = json!({
            "email": self.credentials.api_key(),
            "password": self.credentials.api_secret(),
        });
        let response: LoginResponse = self
            .client
            .post("/users/login", &body, HeaderMap::new())
            .await?;

        if !response.status {
            let reason = response
                .message
                .or(response.error)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(CourierError::authentication(format!("login failed: {}", reason)));
        }
        match response.data {
            Some(token) if !token.is_empty() => {
                info!(courier = CourierCode::XPRESSBEES, "Authenticated");
                Ok(token)
            }
            _ => Err(CourierError::authentication("login failed: no token received")),
        }
    }

    /// Runs `call` with a bearer header, attributing any failure.
    async fn authorized<T, F, Fut>(&self, operation: &'static str, call: F) -> CourierResult<T>
    where
        F: FnOnce(HeaderMap) -> Fut,
        Fut: Future<Output = CourierResult<T>>,
    {
        self.tokens
            .with_token(
                || self.login(),
                |token| async move { call(bearer(&token)?).await },
            )
            .await
            .map_err(|e| e.in_call(CourierCode::XPRESSBEES, operation))
    }
}

fn bearer(token: &str) -> CourierResult<HeaderMap> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| CourierError::authentication(format!("invalid token: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

#[async_trait]
impl CourierProvider for XpressbeesProvider {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(
            CourierCode::XPRESSBEES,
            "Xpressbees",
            "Xpressbees Shipping Services",
        )
    }

    async fn calculate_rate(&self, request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        let body = ServiceabilityRequest {
            origin: &request.origin_pincode,
            destination: &request.destination_pincode,
            payment_type: payment_type(request.payment_mode),
            order_amount: Some(request.collectable_amount),
            weight: request.weight,
            length: Some(request.length),
            breadth: Some(request.width),
            height: Some(request.height),
        };

        self.authorized("calculate_rate", |headers| async move {
            let response: ServiceabilityResponse = self
                .client
                .post("/courier/serviceability", &body, headers)
                .await?;
            if !response.status {
                return Err(CourierError::rejected(
                    response
                        .message
                        .unwrap_or_else(|| "rate calculation failed".to_string()),
                ));
            }
            Ok(response.data.into_iter().next().map(|option| RateQuote {
                base_charge: option.freight_charges,
                cod_charge: option.cod_charges,
                total_charge: option.total_charges,
                expected_days: DEFAULT_EXPECTED_DAYS,
                ..RateQuote::default()
            }))
        })
        .await
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        let body = shipment_payload(request);

        self.authorized("create_shipment", |headers| async move {
            let response: CreateResponse = self.client.post("/shipments2", &body, headers).await?;
            let data = response.data.unwrap_or_default();
            Ok(ShipmentBooking {
                success: response.status,
                order_id: data.order_id,
                shipment_id: data.shipment_id,
                tracking_id: data.awb_number.clone(),
                awb_number: data.awb_number,
                courier_name: data.courier_name,
                label: data.label,
                error: if response.status { None } else { response.message },
            })
        })
        .await
    }

    async fn track_shipment(&self, tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        let path = format!("/shipments2/track/{}", tracking_id);

        self.authorized("track_shipment", |headers| async move {
            let response: TrackResponse = self.client.get(&path, headers).await?;
            Ok(response
                .data
                .map(|data| data.history)
                .unwrap_or_default()
                .into_iter()
                .map(|scan| TrackingEvent {
                    timestamp: TrackingEvent::parse_timestamp(&scan.event_time),
                    status: scan.status_code,
                    location: scan.location,
                    description: scan.message,
                })
                .collect())
        })
        .await
    }

    async fn check_serviceability(
        &self,
        origin_pincode: &str,
        destination_pincode: &str,
        weight: f64,
    ) -> CourierResult<bool> {
        let body = ServiceabilityRequest {
            origin: origin_pincode,
            destination: destination_pincode,
            payment_type: payment_type(PaymentMode::Prepaid),
            order_amount: None,
            weight,
            length: None,
            breadth: None,
            height: None,
        };

        self.authorized("check_serviceability", |headers| async move {
            let response: ServiceabilityResponse = self
                .client
                .post("/courier/serviceability", &body, headers)
                .await?;
            Ok(response.status && !response.data.is_empty())
        })
        .await
    }

    async fn cancel_shipment(&self, tracking_id: &str) -> CourierResult<()> {
        let body = json!({ "awb": tracking_id });

        self.authorized("cancel_shipment", |headers| async move {
            let response: StatusResponse =
                self.client.post("/shipments2/cancel", &body, headers).await?;
            response.into_result("cancellation refused")
        })
        .await
    }

    async fn ndr_list(&self, page: u32, limit: u32) -> CourierResult<Vec<NdrRecord>> {
        let params = [("per_page", limit), ("page", page)];

        self.authorized("ndr_list", |headers| async move {
            let response: NdrListResponse =
                self.client.get_with_params("/ndr", &params, headers).await?;
            Ok(response
                .data
                .into_iter()
                .map(|row| NdrRecord {
                    awb_number: row.awb_number,
                    event_date: row.event_date,
                    courier_remarks: row.courier_remarks,
                    total_attempts: row.total_attempts.value(),
                })
                .collect())
        })
        .await
    }

    async fn update_ndr(&self, actions: &[NdrAction]) -> CourierResult<()> {
        let body: Vec<_> = actions
            .iter()
            .map(|action| {
                json!({
                    "awb": action.awb_number,
                    "action": ndr_action_name(action.action),
                    "action_data": action.action_data,
                })
            })
            .collect();

        self.authorized("update_ndr", |headers| async move {
            let response: StatusResponse = self.client.post("/ndr/create", &body, headers).await?;
            response.into_result("NDR update refused")
        })
        .await
    }
}

fn payment_type(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Cod => "cod",
        PaymentMode::Prepaid => "prepaid",
    }
}

fn ndr_action_name(action: NdrActionType) -> &'static str {
    match action {
        NdrActionType::ReAttempt => "re-attempt",
        NdrActionType::ChangeAddress => "change_address",
        NdrActionType::ChangePhone => "change_phone",
        NdrActionType::Rto => "rto",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Xpressbees expects whole grams and centimetres as strings.
fn whole(value: f64) -> String {
    format!("{:.0}", value.round())
}

fn money(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn address_json(address: &Address) -> serde_json::Value {
    json!({
        "name": address.name,
        "company_name": address.company_name,
        "address": address.address_line1,
        "address_2": address.address_line2,
        "city": address.city,
        "state": address.state,
        "pincode": address.pincode,
        "phone": address.phone,
        "email": address.email,
    })
}

fn shipment_payload(request: &ShipmentRequest) -> serde_json::Value {
    let pickup = &request.pickup;
    let items: Vec<_> = request
        .items
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "qty": item.quantity.to_string(),
                "price": money(item.price),
                "sku": item.sku,
            })
        })
        .collect();

    let mut payload = json!({
        "order_number": request.order_number,
        "payment_type": payment_type(request.payment_type),
        "package_weight": whole(request.package_weight),
        "package_length": whole(request.package_length),
        "package_breadth": whole(request.package_breadth),
        "package_height": whole(request.package_height),
        "shipping_charges": "0",
        "cod_charges": "0",
        "discount": "0",
        "order_amount": money(request.order_amount),
        "collectable_amount": money(request.collectable_amount),
        "request_auto_pickup": yes_no(request.auto_pickup),
        "consignee": address_json(&request.consignee),
        "pickup": {
            "warehouse_name": pickup.company_name,
            "name": pickup.name,
            "address": pickup.address_line1,
            "address_2": pickup.address_line2,
            "city": pickup.city,
            "state": pickup.state,
            "pincode": pickup.pincode,
            "phone": pickup.phone,
            "gst_number": pickup.gstin.clone().unwrap_or_default(),
        },
        "order_items": items,
        "is_rto_different": yes_no(request.rto_address.is_some()),
    });
    if let (Some(rto), Some(object)) = (&request.rto_address, payload.as_object_mut()) {
        object.insert("rto".to_string(), address_json(rto));
    }
    payload
}

#[derive(Debug, Serialize)]
struct ServiceabilityRequest<'a> {
    origin: &'a str,
    destination: &'a str,
    payment_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_amount: Option<Decimal>,
    weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    breadth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    status: bool,
    data: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceabilityResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: Vec<ServiceOption>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceOption {
    #[serde(default)]
    freight_charges: Decimal,
    #[serde(default)]
    cod_charges: Decimal,
    #[serde(default)]
    total_charges: Decimal,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    status: bool,
    message: Option<String>,
    data: Option<CreatedShipment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatedShipment {
    order_id: String,
    shipment_id: String,
    awb_number: String,
    courier_name: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    data: Option<TrackData>,
}

#[derive(Debug, Deserialize)]
struct TrackData {
    #[serde(default)]
    history: Vec<TrackScan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackScan {
    status_code: String,
    location: String,
    event_time: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: bool,
    message: Option<String>,
}

impl StatusResponse {
    fn into_result(self, fallback: &str) -> CourierResult<()> {
        if self.status {
            Ok(())
        } else {
            Err(CourierError::rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct NdrListResponse {
    #[serde(default)]
    data: Vec<NdrRow>,
}

#[derive(Debug, Deserialize)]
struct NdrRow {
    #[serde(default)]
    awb_number: String,
    #[serde(default)]
    event_date: String,
    #[serde(default)]
    courier_remarks: String,
    #[serde(default)]
    total_attempts: Attempts,
}

/// Attempt counts arrive as either a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Attempts {
    Number(u32),
    Text(String),
}

impl Default for Attempts {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl Attempts {
    fn value(&self) -> u32 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}
