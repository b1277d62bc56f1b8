//! # Bluedart Adapter
//!
//! Integration with the Bluedart API gateway.
//!
//! The gateway issues a JWT from `GET /token/v1/login` in exchange for the
//! `ClientID` and `clientSecret` headers. Every other call carries the
//! token in a `JWTToken` header. Responses wrap their payload in a
//! `<Operation>Result` object with an `IsError` flag and a list of status
//! messages.

use crate::domain::entities::{Address, RateRequest, ShipmentRequest};
use crate::domain::value_objects::{CourierCode, PaymentMode};
use crate::infrastructure::couriers::auth::TokenCache;
use crate::infrastructure::couriers::error::{CourierError, CourierResult};
use crate::infrastructure::couriers::http_client::HttpClient;
use crate::infrastructure::couriers::settings::{CourierCredentials, CourierSettings};
use crate::infrastructure::couriers::traits::{
    CourierProvider, ProviderInfo, RateQuote, ShipmentBooking, TrackingEvent,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Production API gateway URL.
pub const DEFAULT_BASE_URL: &str = "https://apigateway.bluedart.com/in/transportation";

/// JWT lifetime granted by the gateway.
const TOKEN_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

/// Bluedart courier adapter.
#[derive(Debug)]
pub struct BluedartProvider {
    client: HttpClient,
    credentials: CourierCredentials,
    tokens: TokenCache,
}

impl BluedartProvider {
    /// Creates the adapter. The first call fetches a JWT.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::InvalidRequest` if the client id or secret
    /// is missing.
    pub fn new(settings: &CourierSettings) -> CourierResult<Self> {
        if !settings.credentials().is_complete() {
            return Err(CourierError::invalid_request(
                "client id (api key) and client secret (api secret) are required",
            ));
        }
        Ok(Self {
            client: HttpClient::new(settings.base_url(), settings.timeout_ms())?,
            credentials: settings.credentials().clone(),
            tokens: TokenCache::new(TOKEN_LIFETIME),
        })
    }

    async fn login(&self) -> CourierResult<String> {
        debug!(courier = CourierCode::BLUEDART, "Requesting JWT");
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("clientid"),
            header_value(self.credentials.api_key())?,
        );
        headers.insert(
            HeaderName::from_static("clientsecret"),
            header_value(self.credentials.api_secret())?,
        );

        let response: LoginResponse = self.client.get("/token/v1/login", headers).await?;
        match response.jwt_token {
            Some(token) if !token.is_empty() => {
                info!(courier = CourierCode::BLUEDART, "Authenticated");
                Ok(token)
            }
            _ => Err(CourierError::authentication("login returned no JWT")),
        }
    }

    async fn authorized<T, F, Fut>(&self, operation: &'static str, call: F) -> CourierResult<T>
    where
        F: FnOnce(HeaderMap) -> Fut,
        Fut: Future<Output = CourierResult<T>>,
    {
        self.tokens
            .with_token(
                || self.login(),
                |token| async move {
                    let mut headers = HeaderMap::new();
                    headers.insert(HeaderName::from_static("jwttoken"), header_value(&token)?);
                    call(headers).await
                },
            )
            .await
            .map_err(|e| e.in_call(CourierCode::BLUEDART, operation))
    }
}

#[async_trait]
impl CourierProvider for BluedartProvider {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(
            CourierCode::BLUEDART,
            "Bluedart",
            "Blue Dart Express air and ground",
        )
    }

    async fn calculate_rate(&self, request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        let body = json!({
            "Request": {
                "OriginPincode": request.origin_pincode,
                "DestinationPincode": request.destination_pincode,
                "ProductCode": "A",
                "SubProductCode": sub_product(request.payment_mode),
                "ActualWeight": kilograms(request.weight),
                "Dimensions": [{
                    "Length": request.length,
                    "Breadth": request.width,
                    "Height": request.height,
                    "Count": 1
                }],
                "CollectableAmount": request.collectable_amount.round_dp(2).to_string(),
            }
        });

        self.authorized("calculate_rate", |headers| async move {
            let response: RateEnvelope = self.client.post("/rates/v1/quote", &body, headers).await?;
            let result = response.result;
            result.check("rate calculation failed")?;
            Ok(result.charges.map(|charges| RateQuote {
                base_charge: charges.base_charge,
                fuel_surcharge: charges.fuel_surcharge,
                cod_charge: charges.cod_charge,
                handling_charge: charges.handling_charge,
                total_charge: charges.total_charge,
                expected_days: charges.transit_days,
            }))
        })
        .await
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        let body = waybill_payload(request);

        self.authorized("create_shipment", |headers| async move {
            let response: WaybillEnvelope = self
                .client
                .post("/waybill/v1/GenerateWayBill", &body, headers)
                .await?;
            let result = response.result;
            let success = !result.is_error && !result.awb_no.is_empty();
            Ok(ShipmentBooking {
                success,
                order_id: request.order_number.clone(),
                shipment_id: result.token_number,
                tracking_id: result.awb_no.clone(),
                awb_number: result.awb_no,
                courier_name: "Bluedart".to_string(),
                label: result.label_url,
                error: if success {
                    None
                } else {
                    Some(status_text(&result.status, "waybill generation failed"))
                },
            })
        })
        .await
    }

    async fn track_shipment(&self, tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        let params = [("numbers", tracking_id), ("format", "json"), ("scan", "1")];

        self.authorized("track_shipment", |headers| async move {
            let response: TrackResponse = self
                .client
                .get_with_params("/tracking/v1/shipment", &params, headers)
                .await?;
            Ok(response
                .shipment_data
                .shipment
                .into_iter()
                .flat_map(|shipment| shipment.scans)
                .map(|scan| {
                    let detail = scan.scan_detail;
                    TrackingEvent {
                        timestamp: scan_time(&detail.scan_date, &detail.scan_time),
                        status: detail.scan,
                        location: detail.scanned_location,
                        description: detail.scan_code,
                    }
                })
                .collect())
        })
        .await
    }

    async fn check_serviceability(
        &self,
        _origin_pincode: &str,
        destination_pincode: &str,
        _weight: f64,
    ) -> CourierResult<bool> {
        let body = json!({ "pinCode": destination_pincode });

        self.authorized("check_serviceability", |headers| async move {
            let response: PincodeEnvelope = self
                .client
                .post("/finder/v1/GetServicesforPincode", &body, headers)
                .await?;
            let result = response.result;
            if result.is_error {
                // An unknown pincode is reported as an error flag.
                return Ok(false);
            }
            Ok([
                &result.apex_inbound,
                &result.etail_prepaid_air_inbound,
                &result.etail_cod_air_inbound,
            ]
            .iter()
            .any(|flag| flag.eq_ignore_ascii_case("yes")))
        })
        .await
    }

    async fn cancel_shipment(&self, tracking_id: &str) -> CourierResult<()> {
        let body = json!({ "Request": { "AWBNo": tracking_id } });

        self.authorized("cancel_shipment", |headers| async move {
            let response: CancelEnvelope = self
                .client
                .post("/waybill/v1/CancelWaybill", &body, headers)
                .await?;
            response.result.check("cancellation refused")
        })
        .await
    }
}

fn header_value(value: &str) -> CourierResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| CourierError::authentication(format!("invalid header value: {}", e)))
}

fn sub_product(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Cod => "C",
        PaymentMode::Prepaid => "P",
    }
}

fn kilograms(grams: f64) -> f64 {
    (grams / 1000.0 * 100.0).round() / 100.0
}

fn scan_time(date: &str, time: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(&format!("{} {}", date.trim(), time.trim()), "%d-%b-%Y %H:%M")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| TrackingEvent::parse_timestamp(date))
}

fn status_text(status: &[StatusInformation], fallback: &str) -> String {
    let joined = status
        .iter()
        .map(|s| s.status_information.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

fn party_json(address: &Address) -> serde_json::Value {
    json!({
        "Name": address.name,
        "CompanyName": address.company_name,
        "Address1": address.address_line1,
        "Address2": address.address_line2,
        "City": address.city,
        "State": address.state,
        "Pincode": address.pincode,
        "Mobile": address.phone,
        "Email": address.email,
        "GSTNumber": address.gstin.clone().unwrap_or_default(),
    })
}

fn waybill_payload(request: &ShipmentRequest) -> serde_json::Value {
    let items: Vec<_> = request
        .items
        .iter()
        .map(|item| {
            json!({
                "ItemName": item.name,
                "SKUNumber": item.sku,
                "Pieces": item.quantity,
                "ItemValue": item.price.round_dp(2).to_string(),
                "HSCode": item.hsn_code.clone().unwrap_or_default(),
            })
        })
        .collect();
    let collectable = if request.payment_type.is_cod() {
        request.collectable_amount
    } else {
        Decimal::ZERO
    };

    json!({
        "Request": {
            "Consignee": party_json(&request.consignee),
            "Shipper": party_json(&request.pickup),
            "Returnadds": party_json(request.return_address()),
            "Services": {
                "ProductCode": "A",
                "SubProductCode": sub_product(request.payment_type),
                "CreditReferenceNo": request.order_number,
                "ActualWeight": kilograms(request.package_weight),
                "DeclaredValue": request.order_amount.round_dp(2).to_string(),
                "CollectableAmount": collectable.round_dp(2).to_string(),
                "PieceCount": 1,
                "Dimensions": [{
                    "Length": request.package_length,
                    "Breadth": request.package_breadth,
                    "Height": request.package_height,
                    "Count": 1
                }],
                "RegisterPickup": request.auto_pickup,
                "itemdtl": items,
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "JWTToken")]
    jwt_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusInformation {
    #[serde(rename = "StatusInformation")]
    status_information: String,
}

#[derive(Debug, Deserialize)]
struct RateEnvelope {
    #[serde(rename = "GetRatesResult")]
    result: GatewayResult,
}

/// Result body shared by rate and cancellation responses.
#[derive(Debug, Deserialize)]
struct GatewayResult {
    #[serde(rename = "IsError", default)]
    is_error: bool,
    #[serde(rename = "Status", default)]
    status: Vec<StatusInformation>,
    #[serde(rename = "ChargeDetails")]
    charges: Option<ChargeDetails>,
}

impl GatewayResult {
    fn check(&self, fallback: &str) -> CourierResult<()> {
        if self.is_error {
            Err(CourierError::rejected(status_text(&self.status, fallback)))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChargeDetails {
    #[serde(rename = "BaseCharge")]
    base_charge: Decimal,
    #[serde(rename = "FuelSurcharge")]
    fuel_surcharge: Decimal,
    #[serde(rename = "CODCharge")]
    cod_charge: Decimal,
    #[serde(rename = "HandlingCharge")]
    handling_charge: Decimal,
    #[serde(rename = "TotalCharge")]
    total_charge: Decimal,
    #[serde(rename = "TransitDays")]
    transit_days: u32,
}

#[derive(Debug, Deserialize)]
struct WaybillEnvelope {
    #[serde(rename = "GenerateWayBillResult")]
    result: WaybillResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaybillResult {
    #[serde(rename = "AWBNo")]
    awb_no: String,
    #[serde(rename = "TokenNumber")]
    token_number: String,
    #[serde(rename = "IsError")]
    is_error: bool,
    #[serde(rename = "Status")]
    status: Vec<StatusInformation>,
    #[serde(rename = "LabelURL")]
    label_url: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    #[serde(rename = "ShipmentData", default)]
    shipment_data: TrackShipmentData,
}

#[derive(Debug, Default, Deserialize)]
struct TrackShipmentData {
    #[serde(rename = "Shipment", default)]
    shipment: Vec<TrackedShipment>,
}

#[derive(Debug, Deserialize)]
struct TrackedShipment {
    #[serde(rename = "Scans", default)]
    scans: Vec<Scan>,
}

#[derive(Debug, Deserialize)]
struct Scan {
    #[serde(rename = "ScanDetail")]
    scan_detail: ScanDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScanDetail {
    #[serde(rename = "Scan")]
    scan: String,
    #[serde(rename = "ScanCode")]
    scan_code: String,
    #[serde(rename = "ScanDate")]
    scan_date: String,
    #[serde(rename = "ScanTime")]
    scan_time: String,
    #[serde(rename = "ScannedLocation")]
    scanned_location: String,
}

#[derive(Debug, Deserialize)]
struct PincodeEnvelope {
    #[serde(rename = "GetServicesforPincodeResult")]
    result: PincodeResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PincodeResult {
    #[serde(rename = "IsError")]
    is_error: bool,
    #[serde(rename = "ApexInbound")]
    apex_inbound: String,
    #[serde(rename = "eTailPrePaidAirInbound")]
    etail_prepaid_air_inbound: String,
    #[serde(rename = "eTailCODAirInbound")]
    etail_cod_air_inbound: String,
}

#[derive(Debug, Deserialize)]
struct CancelEnvelope {
    #[serde(rename = "CancelWaybillResult")]
    result: GatewayResult,
}
