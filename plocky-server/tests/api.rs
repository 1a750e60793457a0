//! End-to-end tests driving the router over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{Router, routing::get};
use plocky_core::{
    Coordinate, GeocodeDocument, Geocoder, MemoryStore, PortError, RoadAddress,
};
use plocky_provider_kakao::KakaoGeocoder;
use plocky_server::{identity::MEMBER_HEADER, router, state::AppState};
use plocky_store_sqlite::SqliteStore;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError> {
        if coordinate.latitude < 0.0 {
            return Ok(Vec::new());
        }
        Ok(vec![GeocodeDocument {
            road_address: Some(RoadAddress {
                region_1: "서울특별시".to_owned(),
                region_2: "마포구".to_owned(),
                region_3: String::new(),
                road_name: "월드컵로".to_owned(),
                main_building_no: "240".to_owned(),
                sub_building_no: String::new(),
            }),
        }])
    }
}

struct DownGeocoder;

#[async_trait]
impl Geocoder for DownGeocoder {
    async fn reverse(&self, _coordinate: Coordinate) -> Result<Vec<GeocodeDocument>, PortError> {
        Err(PortError::MalformedResponse("upstream sent html".to_owned()))
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    format!("http://{addr}")
}

async fn spawn_app(geocoder: Arc<dyn Geocoder>) -> String {
    serve(router(AppState::new(Arc::new(MemoryStore::new()), geocoder))).await
}

fn session_body() -> Value {
    json!({
        "distance": 5.01,
        "startedLatitude": 37.568,
        "startedLongitude": 126.897,
        "endedLatitude": 37.571,
        "endedLongitude": 126.901,
        "startedAt": "2024-05-04T09:00:00",
        "endedAt": "2024-05-04T10:01:01",
        "trash": {
            "paperQuantity": 1,
            "plaQuantity": 2,
            "glassQuantity": 3,
            "canQuantity": 4,
            "foamQuantity": 5,
            "etcQuantity": 6,
            "cigarQuantity": 7
        }
    })
}

async fn register(client: &Client, base: &str, member: &str) {
    let resp = client
        .post(format!("{base}/members"))
        .header(MEMBER_HEADER, member)
        .json(&json!({ "petName": "Dubu", "petKind": "DOG" }))
        .send()
        .await
        .expect("register request");
    assert_eq!(resp.status(), StatusCode::CREATED, "member registered");
}

async fn create_session(client: &Client, base: &str, member: &str, body: &Value) -> u64 {
    let resp = client
        .post(format!("{base}/plogging"))
        .header(MEMBER_HEADER, member)
        .json(body)
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), StatusCode::CREATED, "session created");
    let created: Value = resp.json().await.expect("json body");
    created["ploggingId"].as_u64().expect("numeric id")
}

#[tokio::test]
async fn health_is_public() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let resp = reqwest::get(format!("{base}/health")).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK, "healthy");
}

#[tokio::test]
async fn session_round_trip() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let id = create_session(&client, &base, "kakao-1", &session_body()).await;

    let summary: Value = client
        .get(format!("{base}/plogging/{id}"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("get request")
        .json()
        .await
        .expect("json body");

    assert_eq!(summary["ploggingId"], json!(id), "same session");
    assert_eq!(summary["distance"], json!(5.01), "distance kept");
    assert_eq!(summary["totalHour"], json!(1), "hours");
    assert_eq!(summary["totalMinute"], json!(1), "minutes");
    assert_eq!(summary["totalSecond"], json!(1), "seconds");
    assert_eq!(summary["startedWhere"], json!("서울특별시 마포구 월드컵로 240"), "start");
    assert_eq!(summary["endedWhere"], json!("서울특별시 마포구 월드컵로 240"), "end");
    assert_eq!(summary["trash"], session_body()["trash"], "trash kept");

    let profile: Value = client
        .get(format!("{base}/members/me"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("profile request")
        .json()
        .await
        .expect("json body");
    assert_eq!(profile["totalQuantity"], json!(28), "quantity added");
    assert_eq!(profile["pet"]["level"], json!(2), "5.01 km exceeds 1 and 5");

    let history: Value = client
        .get(format!("{base}/plogging"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("json body");
    assert_eq!(history.as_array().map(Vec::len), Some(1), "one session");
}

#[tokio::test]
async fn coordinates_without_address_use_fallback() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let mut body = session_body();
    body["startedLatitude"] = json!(-33.86);
    let id = create_session(&client, &base, "kakao-1", &body).await;

    let summary: Value = client
        .get(format!("{base}/plogging/{id}"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("get request")
        .json()
        .await
        .expect("json body");
    assert_eq!(
        summary["startedWhere"],
        json!("경기 성남시 분당구 삼평동 624"),
        "fallback address"
    );
}

#[tokio::test]
async fn member_routes_require_identity() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/plogging"))
        .json(&session_body())
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "no header");

    let resp = client
        .get(format!("{base}/members/me"))
        .header(MEMBER_HEADER, "   ")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "blank header");
}

#[tokio::test]
async fn unknown_member_and_session_are_not_found() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/plogging"))
        .header(MEMBER_HEADER, "nobody")
        .json(&session_body())
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "unregistered member");

    register(&client, &base, "kakao-1").await;
    let resp = client
        .get(format!("{base}/plogging/999"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "unknown session");
}

#[tokio::test]
async fn sessions_are_private_to_their_owner() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;
    register(&client, &base, "kakao-2").await;

    let id = create_session(&client, &base, "kakao-1", &session_body()).await;
    let resp = client
        .get(format!("{base}/plogging/{id}"))
        .header(MEMBER_HEADER, "kakao-2")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN, "someone else's session");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let resp = client
        .post(format!("{base}/members"))
        .header(MEMBER_HEADER, "kakao-1")
        .json(&json!({ "petName": "Nabi", "petKind": "CAT" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::CONFLICT, "already registered");
}

#[tokio::test]
async fn reversed_timestamps_are_rejected() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let mut body = session_body();
    body["endedAt"] = json!("2024-05-04T08:00:00");
    let resp = client
        .post(format!("{base}/plogging"))
        .header(MEMBER_HEADER, "kakao-1")
        .json(&body)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "end before start");
}

#[tokio::test]
async fn oversized_distance_is_rejected() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let mut body = session_body();
    body["distance"] = json!(1.0e308);
    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/plogging"))
            .header(MEMBER_HEADER, "kakao-1")
            .json(&body)
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "distance above cap");
    }

    let profile: Value = client
        .get(format!("{base}/members/me"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("profile request")
        .json()
        .await
        .expect("json body");
    assert_eq!(profile["totalDistance"], json!(0.0), "total stays a number");
    assert_eq!(profile["pet"]["level"], json!(0), "no level change");
}

#[tokio::test]
async fn session_round_trip_on_sqlite_store() {
    let store = SqliteStore::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    let base = serve(router(AppState::new(
        Arc::new(store),
        Arc::new(StubGeocoder),
    )))
    .await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let id = create_session(&client, &base, "kakao-1", &session_body()).await;
    let summary: Value = client
        .get(format!("{base}/plogging/{id}"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("get request")
        .json()
        .await
        .expect("json body");
    assert_eq!(summary["startedWhere"], json!("서울특별시 마포구 월드컵로 240"), "start");
    assert_eq!(summary["totalHour"], json!(1), "hours");
    assert_eq!(summary["trash"], session_body()["trash"], "trash kept");

    let profile: Value = client
        .get(format!("{base}/members/me"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("profile request")
        .json()
        .await
        .expect("json body");
    assert_eq!(profile["totalQuantity"], json!(28), "quantity added");
    assert_eq!(profile["pet"]["level"], json!(2), "5.01 km exceeds 1 and 5");

    let resp = client
        .post(format!("{base}/members"))
        .header(MEMBER_HEADER, "kakao-1")
        .json(&json!({ "petName": "Nabi", "petKind": "CAT" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::CONFLICT, "unique identity enforced");
}

#[tokio::test]
async fn geocoder_failure_is_bad_gateway() {
    let base = spawn_app(Arc::new(DownGeocoder)).await;
    let client = Client::new();
    register(&client, &base, "kakao-1").await;

    let resp = client
        .post(format!("{base}/plogging"))
        .header(MEMBER_HEADER, "kakao-1")
        .json(&session_body())
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY, "upstream broken");

    let profile: Value = client
        .get(format!("{base}/members/me"))
        .header(MEMBER_HEADER, "kakao-1")
        .send()
        .await
        .expect("profile request")
        .json()
        .await
        .expect("json body");
    assert_eq!(profile["totalQuantity"], json!(0), "nothing recorded");
}

#[tokio::test]
async fn slow_geocoder_times_out() {
    let upstream = serve(Router::new().route(
        "/v2/local/geo/coord2address.json",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{\"documents\":[]}"
        }),
    ))
    .await;
    let client = Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("client");
    let geocoder = Arc::new(KakaoGeocoder::with_base_url(client, "key", upstream));
    let base = spawn_app(geocoder).await;

    let client = Client::new();
    register(&client, &base, "kakao-1").await;
    let resp = client
        .post(format!("{base}/plogging"))
        .header(MEMBER_HEADER, "kakao-1")
        .json(&session_body())
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT, "bounded wait");
}

#[tokio::test]
async fn trashcan_crud() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/trashcan"))
        .json(&json!({ "latitude": 37.39, "longitude": 127.11, "address": "판교역 1번 출구" }))
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), StatusCode::CREATED, "created");
    let created: Value = resp.json().await.expect("json body");
    let id = created["trashcanId"].as_u64().expect("numeric id");

    let listed: Value = client
        .get(format!("{base}/trashcan"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("json body");
    assert_eq!(listed, json!([created]), "listed");

    let resp = client
        .delete(format!("{base}/trashcan?trashcanId={id}"))
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT, "deleted");

    let listed: Value = client
        .get(format!("{base}/trashcan"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("json body");
    assert_eq!(listed, json!([]), "gone");

    let resp = client
        .delete(format!("{base}/trashcan?trashcanId={id}"))
        .send()
        .await
        .expect("delete request");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "already deleted");
}

#[tokio::test]
async fn trashcan_with_bad_coordinates_is_rejected() {
    let base = spawn_app(Arc::new(StubGeocoder)).await;
    let resp = Client::new()
        .post(format!("{base}/trashcan"))
        .json(&json!({ "latitude": 91.0, "longitude": 127.11 }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "latitude above 90");
}
