//! # Delhivery Adapter
//!
//! REST integration authenticated with a static API token sent as
//! `Authorization: Token <key>` on every request.
//!
//! Shipment creation is form-encoded (`format=json&data=<json>`); every
//! other call is plain query-string or JSON.

use crate::domain::entities::{Address, RateRequest, ShipmentRequest};
use crate::domain::value_objects::{CourierCode, PaymentMode};
use crate::infrastructure::couriers::error::{CourierError, CourierResult};
use crate::infrastructure::couriers::http_client::HttpClient;
use crate::infrastructure::couriers::settings::CourierSettings;
use crate::infrastructure::couriers::traits::{
    CourierProvider, ProviderInfo, RateQuote, ShipmentBooking, TrackingEvent,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://track.delhivery.com";

/// Surface transit estimate; the charges API reports none.
const DEFAULT_EXPECTED_DAYS: u32 = 4;

/// COD fee applied when the charges API does not itemize one.
const FALLBACK_COD_CHARGE: i64 = 50;

/// Delhivery courier adapter.
#[derive(Debug)]
pub struct DelhiveryProvider {
    client: HttpClient,
}

impl DelhiveryProvider {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::InvalidRequest` if the API token is missing
    /// or not a valid header value.
    pub fn new(settings: &CourierSettings) -> CourierResult<Self> {
        let credentials = settings.credentials();
        if !credentials.has_key() {
            return Err(CourierError::invalid_request("API token (api key) is required"));
        }
        let token = HeaderValue::from_str(&format!("Token {}", credentials.api_key()))
            .map_err(|e| CourierError::invalid_request(format!("invalid API token: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);

        Ok(Self {
            client: HttpClient::with_headers(settings.base_url(), settings.timeout_ms(), headers)?,
        })
    }

    async fn fetch_rate(&self, request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        let grams = format!("{:.0}", request.weight.ceil());
        let params = [
            ("md", "S"),
            ("cgm", grams.as_str()),
            ("o_pin", request.origin_pincode.as_str()),
            ("d_pin", request.destination_pincode.as_str()),
            ("ss", "Delivered"),
            ("pt", payment_type(request.payment_mode)),
        ];
        let response: ChargesResponse = self
            .client
            .get_with_params("/api/kinko/v1/invoice/charges/.json", &params, HeaderMap::new())
            .await?;

        let charge = match response {
            ChargesResponse::Many(list) => list.into_iter().next(),
            ChargesResponse::One(single) => Some(single),
        };
        let Some(charge) = charge else {
            return Ok(None);
        };
        if let Some(message) = charge.error.filter(|m| !m.is_empty()) {
            return Err(CourierError::rejected(message));
        }

        let cod_charge = match (request.payment_mode, charge.charge_cod) {
            (_, Some(reported)) => reported,
            (PaymentMode::Cod, None) => Decimal::from(FALLBACK_COD_CHARGE),
            (PaymentMode::Prepaid, None) => Decimal::ZERO,
        };
        Ok(Some(RateQuote {
            base_charge: charge.charge_dl.unwrap_or(charge.gross_amount),
            fuel_surcharge: charge.charge_fsc.unwrap_or_default(),
            cod_charge,
            handling_charge: Decimal::ZERO,
            total_charge: charge.total_amount,
            expected_days: DEFAULT_EXPECTED_DAYS,
        }))
    }

    async fn fetch_serviceability(&self, origin: &str, destination: &str) -> CourierResult<bool> {
        let filter = format!("{},{}", origin, destination);
        let response: PincodeResponse = self
            .client
            .get_with_params(
                "/c/api/pin-codes/json/",
                &[("filter_codes", filter.as_str())],
                HeaderMap::new(),
            )
            .await?;

        let find = |pin: &str| {
            response
                .delivery_codes
                .iter()
                .map(|entry| &entry.postal_code)
                .find(|code| code.pin.as_str() == pin.trim())
        };
        let can_pick_up = find(origin).is_some_and(|code| is_yes(&code.pickup));
        let can_deliver =
            find(destination).is_some_and(|code| is_yes(&code.pre_paid) || is_yes(&code.cod));
        Ok(can_pick_up && can_deliver)
    }

    async fn submit_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        let data = shipment_payload(request);
        let form = [("format", "json".to_string()), ("data", data.to_string())];
        let response: CreateResponse = self
            .client
            .post_form("/api/cmu/create.json", &form, HeaderMap::new())
            .await?;

        let package = response.packages.into_iter().next().unwrap_or_default();
        let success = response.success && !package.waybill.is_empty();
        let error = if success {
            None
        } else {
            let remarks = package.remarks.join("; ");
            Some(if remarks.is_empty() {
                response.rmk.unwrap_or_else(|| "shipment creation failed".to_string())
            } else {
                remarks
            })
        };

        Ok(ShipmentBooking {
            success,
            order_id: package.refnum,
            shipment_id: package.waybill.clone(),
            tracking_id: package.waybill.clone(),
            label: if success {
                self.client
                    .url(&format!("/api/p/packing_slip?wbns={}", package.waybill))
            } else {
                String::new()
            },
            awb_number: package.waybill,
            courier_name: "Delhivery".to_string(),
            error,
        })
    }

    async fn fetch_tracking(&self, tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        let response: TrackResponse = self
            .client
            .get_with_params(
                "/api/v1/packages/json/",
                &[("waybill", tracking_id)],
                HeaderMap::new(),
            )
            .await?;

        Ok(response
            .shipment_data
            .into_iter()
            .flat_map(|data| data.shipment.scans)
            .map(|scan| {
                let detail = scan.scan_detail;
                TrackingEvent {
                    timestamp: TrackingEvent::parse_timestamp(&detail.scan_date_time),
                    status: detail.scan,
                    location: detail.scanned_location,
                    description: detail.instructions,
                }
            })
            .collect())
    }

    async fn submit_cancellation(&self, tracking_id: &str) -> CourierResult<()> {
        let body = json!({ "waybill": tracking_id, "cancellation": "true" });
        let response: CancelResponse = self.client.post("/api/p/edit", &body, HeaderMap::new()).await?;
        if response.status {
            Ok(())
        } else {
            Err(CourierError::rejected(
                response.remark.unwrap_or_else(|| "cancellation refused".to_string()),
            ))
        }
    }
}

#[async_trait]
impl CourierProvider for DelhiveryProvider {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(
            CourierCode::DELHIVERY,
            "Delhivery",
            "Delhivery Express and Surface",
        )
    }

    async fn calculate_rate(&self, request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        self.fetch_rate(request)
            .await
            .map_err(|e| e.in_call(CourierCode::DELHIVERY, "calculate_rate"))
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        self.submit_shipment(request)
            .await
            .map_err(|e| e.in_call(CourierCode::DELHIVERY, "create_shipment"))
    }

    async fn track_shipment(&self, tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        self.fetch_tracking(tracking_id)
            .await
            .map_err(|e| e.in_call(CourierCode::DELHIVERY, "track_shipment"))
    }

    async fn check_serviceability(
        &self,
        origin_pincode: &str,
        destination_pincode: &str,
        _weight: f64,
    ) -> CourierResult<bool> {
        self.fetch_serviceability(origin_pincode, destination_pincode)
            .await
            .map_err(|e| e.in_call(CourierCode::DELHIVERY, "check_serviceability"))
    }

    async fn cancel_shipment(&self, tracking_id: &str) -> CourierResult<()> {
        self.submit_cancellation(tracking_id)
            .await
            .map_err(|e| e.in_call(CourierCode::DELHIVERY, "cancel_shipment"))
    }
}

fn payment_type(mode: PaymentMode) -> &'static str {
    match mode {
        PaymentMode::Cod => "COD",
        PaymentMode::Prepaid => "Pre-paid",
    }
}

fn is_yes(flag: &str) -> bool {
    flag.eq_ignore_ascii_case("y")
}

fn shipment_payload(request: &ShipmentRequest) -> serde_json::Value {
    let consignee = &request.consignee;
    let rto: &Address = request.return_address();
    let products = request
        .items
        .iter()
        .map(|item| format!("{} x{}", item.name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ");
    let cod_amount = if request.payment_type.is_cod() {
        request.collectable_amount
    } else {
        Decimal::ZERO
    };

    json!({
        "shipments": [{
            "name": consignee.name,
            "add": consignee.full_street(),
            "pin": consignee.pincode,
            "city": consignee.city,
            "state": consignee.state,
            "country": "India",
            "phone": consignee.phone,
            "order": request.order_number,
            "payment_mode": payment_type(request.payment_type),
            "return_pin": rto.pincode,
            "return_city": rto.city,
            "return_phone": rto.phone,
            "return_add": rto.full_street(),
            "return_state": rto.state,
            "return_country": "India",
            "products_desc": products,
            "cod_amount": cod_amount.round_dp(2).to_string(),
            "total_amount": request.order_amount.round_dp(2).to_string(),
            "seller_name": request.pickup.company_name,
            "seller_gst_tin": request.pickup.gstin.clone().unwrap_or_default(),
            "quantity": request.items.iter().map(|item| item.quantity).sum::<u32>(),
            "shipment_length": request.package_length,
            "shipment_width": request.package_breadth,
            "shipment_height": request.package_height,
            "weight": request.package_weight,
        }],
        "pickup_location": {
            "name": request.pickup.company_name,
        },
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChargesResponse {
    Many(Vec<Charge>),
    One(Charge),
}

#[derive(Debug, Deserialize)]
struct Charge {
    #[serde(default)]
    total_amount: Decimal,
    #[serde(default)]
    gross_amount: Decimal,
    #[serde(rename = "charge_DL")]
    charge_dl: Option<Decimal>,
    #[serde(rename = "charge_FSC")]
    charge_fsc: Option<Decimal>,
    #[serde(rename = "charge_COD")]
    charge_cod: Option<Decimal>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PincodeResponse {
    #[serde(default)]
    delivery_codes: Vec<DeliveryCode>,
}

#[derive(Debug, Deserialize)]
struct DeliveryCode {
    postal_code: PostalCode,
}

#[derive(Debug, Deserialize)]
struct PostalCode {
    #[serde(deserialize_with = "pin_as_string")]
    pin: String,
    #[serde(default)]
    pre_paid: String,
    #[serde(default)]
    cod: String,
    #[serde(default)]
    pickup: String,
}

/// Pincodes come back as JSON numbers.
fn pin_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    packages: Vec<CreatedPackage>,
    rmk: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatedPackage {
    waybill: String,
    refnum: String,
    remarks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    #[serde(rename = "ShipmentData", default)]
    shipment_data: Vec<ShipmentData>,
}

#[derive(Debug, Deserialize)]
struct ShipmentData {
    #[serde(rename = "Shipment")]
    shipment: TrackedShipment,
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
    #[serde(rename = "ScanDateTime")]
    scan_date_time: String,
    #[serde(rename = "ScannedLocation")]
    scanned_location: String,
    #[serde(rename = "Instructions")]
    instructions: String,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    #[serde(default)]
    status: bool,
    remark: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::requests::tests::{rate_request, shipment_request};
    use crate::infrastructure::couriers::settings::CourierCredentials;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> DelhiveryProvider {
        let settings = CourierSettings::new(server.uri())
            .with_credentials(CourierCredentials::new("dl-token", ""))
            .with_timeout_ms(2_000);
        DelhiveryProvider::new(&settings).unwrap()
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = DelhiveryProvider::new(&CourierSettings::new(DEFAULT_BASE_URL)).unwrap_err();
        assert!(matches!(err, CourierError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn calculate_rate_sends_token_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/kinko/v1/invoice/charges/.json"))
            .and(header("authorization", "Token dl-token"))
            .and(query_param("md", "S"))
            .and(query_param("cgm", "1000"))
            .and(query_param("o_pin", "400001"))
            .and(query_param("d_pin", "110001"))
            .and(query_param("ss", "Delivered"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "total_amount": 130,
                "gross_amount": 110.0,
                "charge_DL": 95.0,
                "charge_FSC": 15.0
            }])))
            .mount(&server)
            .await;

        let quote = provider(&server)
            .calculate_rate(&rate_request())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quote.base_charge, Decimal::from(95));
        assert_eq!(quote.fuel_surcharge, Decimal::from(15));
        assert_eq!(quote.cod_charge, Decimal::ZERO);
        assert_eq!(quote.total_charge, Decimal::from(130));
        assert_eq!(quote.expected_days, 4);
    }

    #[tokio::test]
    async fn single_object_response_and_cod_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/kinko/v1/invoice/charges/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_amount": 160,
                "gross_amount": 150
            })))
            .mount(&server)
            .await;

        let mut request = rate_request();
        request.payment_mode = PaymentMode::Cod;
        let quote = provider(&server)
            .calculate_rate(&request)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quote.base_charge, Decimal::from(150));
        assert_eq!(quote.cod_charge, Decimal::from(50));
        assert_eq!(quote.total_charge, Decimal::from(160));
    }

    #[tokio::test]
    async fn empty_charge_list_is_no_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/kinko/v1/invoice/charges/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(provider(&server)
            .calculate_rate(&rate_request())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn upstream_failure_names_courier_and_operation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .calculate_rate(&rate_request())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("DELHIVERY calculate_rate failed"));
    }

    #[tokio::test]
    async fn serviceability_requires_pickup_and_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c/api/pin-codes/json/"))
            .and(query_param("filter_codes", "400001,110001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "delivery_codes": [
                    {"postal_code": {"pin": 400001, "pre_paid": "Y", "cod": "Y", "pickup": "Y"}},
                    {"postal_code": {"pin": 110001, "pre_paid": "Y", "cod": "N", "pickup": "N"}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c/api/pin-codes/json/"))
            .and(query_param("filter_codes", "400001,999999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "delivery_codes": [
                    {"postal_code": {"pin": 400001, "pre_paid": "Y", "cod": "Y", "pickup": "Y"}}
                ]
            })))
            .mount(&server)
            .await;

        let dl = provider(&server);
        assert!(dl.check_serviceability("400001", "110001", 500.0).await.unwrap());
        assert!(!dl.check_serviceability("400001", "999999", 500.0).await.unwrap());
    }

    #[tokio::test]
    async fn create_shipment_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cmu/create.json"))
            .and(body_string_contains("format=json"))
            .and(body_string_contains("TEST123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "packages": [{"waybill": "DL9001", "refnum": "TEST123", "status": "Success", "remarks": []}]
            })))
            .mount(&server)
            .await;

        let booking = provider(&server)
            .create_shipment(&shipment_request("TEST123"))
            .await
            .unwrap();
        assert!(booking.success);
        assert_eq!(booking.awb_number, "DL9001");
        assert_eq!(booking.order_id, "TEST123");
        assert!(booking.label.ends_with("/api/p/packing_slip?wbns=DL9001"));
    }

    #[tokio::test]
    async fn create_shipment_surfaces_remarks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cmu/create.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "packages": [{"waybill": "", "refnum": "TEST123", "remarks": ["Duplicate order id"]}]
            })))
            .mount(&server)
            .await;

        let booking = provider(&server)
            .create_shipment(&shipment_request("TEST123"))
            .await
            .unwrap();
        assert!(!booking.success);
        assert_eq!(booking.error.as_deref(), Some("Duplicate order id"));
        assert!(booking.label.is_empty());
    }

    #[tokio::test]
    async fn track_flattens_scans() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/packages/json/"))
            .and(query_param("waybill", "DL9001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ShipmentData": [{"Shipment": {"Scans": [
                    {"ScanDetail": {"Scan": "Manifested", "ScanDateTime": "2024-05-01T09:00:00.000", "ScannedLocation": "Mumbai_Hub", "Instructions": "Shipment manifested"}},
                    {"ScanDetail": {"Scan": "In Transit", "ScanDateTime": "2024-05-01T18:20:00.000", "ScannedLocation": "Bhiwandi_Gateway", "Instructions": "Bag received"}}
                ]}}]
            })))
            .mount(&server)
            .await;

        let events = provider(&server).track_shipment("DL9001").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].status, "In Transit");
        assert_eq!(events[1].location, "Bhiwandi_Gateway");
        assert!(events.iter().all(|e| e.timestamp.is_some()));
    }

    #[tokio::test]
    async fn cancel_refusal_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/p/edit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": false,
                "remark": "Shipment already dispatched"
            })))
            .mount(&server)
            .await;

        let err = provider(&server).cancel_shipment("DL9001").await.unwrap_err();
        assert!(matches!(err.kind(), CourierError::Rejected { .. }));
    }

    #[tokio::test]
    async fn ndr_is_unsupported() {
        let server = MockServer::start().await;
        let err = provider(&server).ndr_list(1, 10).await.unwrap_err();
        assert!(matches!(err.kind(), CourierError::Unsupported { .. }));
    }
}
