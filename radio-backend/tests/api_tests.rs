//! Internal callback router tests

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use helpers::MemoryRepository;
use radio_backend::{build_router, AppState, RuntimeBridge};
use radio_common::models::{NextSong, Station};
use radio_common::StationFilesystem;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn setup() -> (MemoryRepository, axum::Router) {
    let mut station = Station::new(1, "Test Radio");
    station.adapter_api_key = Some("k3y".to_string());
    station.frontend_config.source_pw = Some("hackme".to_string());

    let repo = MemoryRepository::with_station(station);
    let bridge = RuntimeBridge::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        StationFilesystem::new("/srv/stations"),
        PathBuf::from("/usr/share/radio/error.mp3"),
    );

    (repo, build_router(AppState::new(Arc::new(bridge))))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_, app) = setup();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("\"status\":\"accepting callbacks\""));
    assert!(body.contains("\"endpoints\":[\"nextsong\",\"auth\",\"djon\",\"djoff\"]"));
}

#[tokio::test]
async fn test_wrong_api_key_is_forbidden() {
    let (_, app) = setup();

    let response = app
        .oneshot(post("/api/internal/1/nextsong", "api_auth=nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_station_is_not_found() {
    let (_, app) = setup();

    let response = app
        .oneshot(post("/api/internal/9/nextsong", "api_auth=k3y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nextsong_returns_track() {
    let (repo, app) = setup();
    repo.state
        .lock()
        .unwrap()
        .queue
        .push_back(NextSong::Raw("/media/raw.mp3".to_string()));

    let response = app
        .oneshot(post("/api/internal/1/nextsong", "api_auth=k3y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "/media/raw.mp3");
}

#[tokio::test]
async fn test_auth_endpoint_with_packed_credentials() {
    let (repo, app) = setup();
    repo.add_streamer(5, 1, "alice", "secret");

    let response = app
        .oneshot(post(
            "/api/internal/1/auth",
            "dj_user=shoutcast&dj_password=alice%3Asecret&api_auth=k3y",
        ))
        .await
        .unwrap();

    assert_eq!(body_text(response).await, "true");
    assert_eq!(repo.station_now(1).current_streamer_id, Some(5));
}

#[tokio::test]
async fn test_djon_sets_live_flag() {
    let (repo, app) = setup();

    let response = app
        .oneshot(post("/api/internal/1/djon", "api_auth=k3y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(repo.station_now(1).is_streamer_live);
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let (_, app) = setup();

    let response = app
        .oneshot(post("/api/internal/1/reboot", "api_auth=k3y"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
