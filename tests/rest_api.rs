#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use shipment_hub::api::rest::{AppState, create_router};
use shipment_hub::domain::entities::{RateRequest, ShipmentRequest};
use shipment_hub::infrastructure::couriers::{
    CourierError, CourierProvider, CourierResult, NdrAction, NdrRecord, ProviderInfo, RateQuote,
    ShipmentBooking, TrackingEvent,
};
use shipment_hub::infrastructure::persistence::in_memory::InMemoryTrackingStore;
use shipment_hub::infrastructure::rate_limit::RateLimiter;
use shipment_hub::{CourierRegistry, ShipmentAggregationService, TrackingService};

/// Courier that quotes a fixed price and books everything.
#[derive(Debug)]
struct FixedCourier {
    code: &'static str,
    total: i64,
    serviceable: bool,
    calls: AtomicUsize,
}

impl FixedCourier {
    fn new(code: &'static str, total: i64) -> Self {
        Self {
            code,
            total,
            serviceable: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CourierProvider for FixedCourier {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new(self.code, self.code.to_lowercase(), "fixed-price courier")
    }

    async fn calculate_rate(&self, _request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(RateQuote {
            base_charge: Decimal::from(self.total - 10),
            fuel_surcharge: Decimal::from(10),
            total_charge: Decimal::from(self.total),
            expected_days: 2,
            ..RateQuote::default()
        }))
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let awb = format!("{}{}", &self.code[..2], request.order_number);
        Ok(ShipmentBooking {
            success: true,
            order_id: request.order_number.clone(),
            tracking_id: awb.clone(),
            awb_number: awb,
            courier_name: self.code.to_string(),
            ..ShipmentBooking::default()
        })
    }

    async fn track_shipment(&self, _tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TrackingEvent {
            status: "IN_TRANSIT".to_string(),
            location: "Pune Hub".to_string(),
            timestamp: TrackingEvent::parse_timestamp("2024-05-02 08:00:00"),
            description: "Arrived at hub".to_string(),
        }])
    }

    async fn check_serviceability(&self, _: &str, _: &str, _: f64) -> CourierResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.serviceable)
    }

    async fn cancel_shipment(&self, _tracking_id: &str) -> CourierResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ndr_list(&self, _page: u32, _limit: u32) -> CourierResult<Vec<NdrRecord>> {
        Ok(vec![NdrRecord {
            awb_number: "XP0001".to_string(),
            event_date: "2024-05-03".to_string(),
            courier_remarks: "Door locked".to_string(),
            total_attempts: 2,
        }])
    }

    async fn update_ndr(&self, _actions: &[NdrAction]) -> CourierResult<()> {
        Ok(())
    }
}

/// Courier whose every call fails upstream.
#[derive(Debug)]
struct DownCourier;

#[async_trait]
impl CourierProvider for DownCourier {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("BLUEDART", "Bluedart", "unreachable courier")
    }

    async fn calculate_rate(&self, _request: &RateRequest) -> CourierResult<Option<RateQuote>> {
        Err(CourierError::connection("connection refused").in_call("BLUEDART", "calculate_rate"))
    }

    async fn create_shipment(&self, _request: &ShipmentRequest) -> CourierResult<ShipmentBooking> {
        Err(CourierError::connection("connection refused").in_call("BLUEDART", "create_shipment"))
    }

    async fn track_shipment(&self, _tracking_id: &str) -> CourierResult<Vec<TrackingEvent>> {
        Err(CourierError::connection("connection refused").in_call("BLUEDART", "track_shipment"))
    }

    async fn check_serviceability(&self, _: &str, _: &str, _: f64) -> CourierResult<bool> {
        Err(CourierError::connection("connection refused")
            .in_call("BLUEDART", "check_serviceability"))
    }

    async fn cancel_shipment(&self, _tracking_id: &str) -> CourierResult<()> {
        Err(CourierError::connection("connection refused").in_call("BLUEDART", "cancel_shipment"))
    }
}

struct TestApp {
    router: axum::Router,
    xpressbees: Arc<FixedCourier>,
}

fn setup() -> TestApp {
    setup_with_limit(40)
}

fn setup_with_limit(xpressbees_per_minute: u32) -> TestApp {
    let xpressbees = Arc::new(FixedCourier::new("XPRESSBEES", 110));
    let registry = CourierRegistry::new();
    registry.register(xpressbees.clone(), RateLimiter::per_minute(xpressbees_per_minute));
    registry.register(
        Arc::new(FixedCourier::new("DELHIVERY", 95)),
        RateLimiter::per_minute(40),
    );
    registry.register(Arc::new(DownCourier), RateLimiter::per_minute(40));

    let tracking = TrackingService::new(Arc::new(InMemoryTrackingStore::new()));
    let service = ShipmentAggregationService::new(Arc::new(registry), tracking);
    TestApp {
        router: create_router(Arc::new(AppState::new(Arc::new(service)))),
        xpressbees,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn rate_body(codes: &[&str]) -> Value {
    json!({
        "origin_pincode": "400001",
        "destination_pincode": "110001",
        "weight": 500.0,
        "length": 10.0,
        "width": 10.0,
        "height": 5.0,
        "payment_mode": "PREPAID",
        "courier_codes": codes,
    })
}

fn address(name: &str, pincode: &str) -> Value {
    json!({
        "name": name,
        "phone": "9876543210",
        "address_line1": "12 MG Road",
        "city": "Mumbai",
        "state": "MH",
        "pincode": pincode,
    })
}

fn shipment_body(courier: &str, order: &str, weight: f64) -> Value {
    json!({
        "account_id": "acc-42",
        "courier_code": courier,
        "shipment": {
            "order_number": order,
            "payment_type": "PREPAID",
            "package_weight": weight,
            "package_length": 10.0,
            "package_breadth": 10.0,
            "package_height": 5.0,
            "order_amount": "999",
            "consignee": address("Asha Rao", "110001"),
            "pickup": address("Acme Warehouse", "400001"),
            "items": [{ "name": "T-shirt", "quantity": 1, "price": "999" }],
        }
    })
}

async fn create(app: &TestApp, courier: &str, order: &str) -> Value {
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body(courier, order, 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_lists_registered_couriers() {
    let app = setup();
    let response = app.router.oneshot(get_request("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    let codes: Vec<_> = body["couriers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["BLUEDART", "DELHIVERY", "XPRESSBEES"]);
    assert_eq!(body["couriers"][0]["name"], "Bluedart");
    assert_eq!(body["couriers"][0]["available_tokens"], 40.0);
}

#[tokio::test]
async fn rates_merge_partial_failures() {
    let app = setup();
    let response = app
        .router
        .oneshot(json_request("POST", "/api/v1/rates", rate_body(&[])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["rates"].as_array().unwrap().len(), 2);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("BLUEDART calculate_rate failed")
    );
}

#[tokio::test]
async fn rates_for_single_courier() {
    let app = setup();
    let response = app
        .router
        .oneshot(json_request("POST", "/api/v1/rates", rate_body(&["xpressbees"])))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["error"], "");
    assert_eq!(body["rates"][0]["courier_code"], "XPRESSBEES");
    assert_eq!(body["rates"][0]["total_charge"], "110");
    assert_eq!(body["rates"][0]["expected_days"], 2);
}

#[tokio::test]
async fn rates_only_failing_courier() {
    let app = setup();
    let response = app
        .router
        .oneshot(json_request("POST", "/api/v1/rates", rate_body(&["BLUEDART"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["rates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_rate_request_is_bad_request() {
    let app = setup();
    let mut body = rate_body(&[]);
    body["weight"] = json!(0.0);
    let response = app
        .router
        .oneshot(json_request("POST", "/api/v1/rates", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("weight"));
    assert_eq!(app.xpressbees.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn available_couriers_reports_failures() {
    let app = setup();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v1/couriers/available",
            json!({
                "origin_pincode": "400001",
                "destination_pincode": "110001",
                "weight": 500.0,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["couriers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn create_then_read_back() {
    let app = setup();
    let created = create(&app, "XPRESSBEES", "TEST123").await;
    assert_eq!(created["success"], true);
    assert_eq!(created["courier_awb"], "XPTEST123");
    assert_eq!(created["status"], "CREATED");

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/XPTEST123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let details = body_json(response).await;
    assert_eq!(details["shipment"]["order_id"], "TEST123");
    assert_eq!(details["events"][0]["status"], "CREATED");
    assert_eq!(details["events"][0]["description"], "Shipment created successfully");

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/orders/TEST123/shipment"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["tracking_id"], "XPTEST123");
}

#[tokio::test]
async fn create_rejections_map_to_statuses() {
    let app = setup();

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("XPRESSBEES", "TEST123", 0.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.xpressbees.calls.load(Ordering::SeqCst), 0);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("FEDEX", "TEST123", 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "unknown courier: FEDEX");

    create(&app, "XPRESSBEES", "TEST123").await;
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("DELHIVERY", "TEST123", 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("BLUEDART", "O-9", 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn exhausted_rate_limit_is_too_many_requests() {
    let app = setup_with_limit(1);
    create(&app, "XPRESSBEES", "O-1").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("XPRESSBEES", "O-2", 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["error"],
        "rate limit exceeded for XPRESSBEES"
    );
}

#[tokio::test]
async fn tracking_refresh_records_events() {
    let app = setup();
    create(&app, "XPRESSBEES", "T-1").await;

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/XPT-1/tracking?refresh=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["courier_code"], "XPRESSBEES");
    assert_eq!(body["recorded_events"], 1);
    assert_eq!(body["events"][0]["location"], "Pune Hub");

    let details = body_json(
        app.router
            .clone()
            .oneshot(get_request("/api/v1/shipments/XPT-1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(details["shipment"]["status"], "IN_TRANSIT");
    assert_eq!(details["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn tracking_unknown_shipment_needs_courier() {
    let app = setup();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/UNKNOWN/tracking"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/UNKNOWN/tracking?courier_code=delhivery"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["courier_code"], "DELHIVERY");
}

#[tokio::test]
async fn cancel_updates_status() {
    let app = setup();
    create(&app, "DELHIVERY", "C-1").await;

    let response = app
        .router
        .clone()
        .oneshot(post_request("/api/v1/shipments/DEC-1/cancel"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "CANCELLED");

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/orders/C-1/shipment"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "CANCELLED");
}

#[tokio::test]
async fn missing_shipments_are_not_found() {
    let app = setup();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/NOPE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/orders/NOPE/shipment"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn archived_shipment_is_gone() {
    let app = setup();
    create(&app, "XPRESSBEES", "A-1").await;

    let delete = |uri: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };
    let response = app
        .router
        .clone()
        .oneshot(delete("/api/v1/shipments/XPA-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/shipments/XPA-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(delete("/api/v1/shipments/XPA-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/v1/shipments", shipment_body("XPRESSBEES", "A-1", 500.0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.xpressbees.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn account_listing_paginates() {
    let app = setup_with_limit(100);
    for i in 1..=12 {
        create(&app, "XPRESSBEES", &format!("P{:02}", i)).await;
    }

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/accounts/acc-42/shipments?page=2&page_size=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 12);
    assert_eq!(body["page"], 2);
    let orders: Vec<_> = body["shipments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["order_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(orders, vec!["P07", "P06", "P05", "P04", "P03"]);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/accounts/acc-42/shipments?page_size=500"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/accounts/acc-42/shipments"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["page_size"], 10);
    assert_eq!(body["shipments"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn ndr_endpoints() {
    let app = setup();
    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/couriers/xpressbees/ndr"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let records = body_json(response).await;
    assert_eq!(records[0]["awb_number"], "XP0001");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/couriers/XPRESSBEES/ndr",
            json!({ "actions": [{ "awb_number": "XP0001", "action": "re_attempt" }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["submitted"], 1);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/v1/couriers/BLUEDART/ndr"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
