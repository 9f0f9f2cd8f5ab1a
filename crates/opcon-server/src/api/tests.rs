use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, persistence, state::AppState};

const DRONE_TOKEN: &str = "test-drone-token";
const OPERATOR_TOKEN: &str = "test-operator-token";

async fn setup_app() -> (axum::Router, Arc<AppState>) {
    let mut config = Config::from_env();
    config.database_path = std::env::temp_dir()
        .join(format!("opcon-test-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    config.drone_token = DRONE_TOKEN.to_string();
    config.operator_token = OPERATOR_TOKEN.to_string();
    config.auto_accept_first = false;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let state = Arc::new(AppState::with_database(db, config.clone()));
    state.load_from_database().await.expect("load db");

    let app = api::routes(&config).with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn telemetry_request(drone_id: &str, lat: f64, lon: f64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/telemetry")
        .header("content-type", "application/json")
        .header("X-Drone-Token", DRONE_TOKEN)
        .body(Body::from(
            json!({
                "drone_id": drone_id,
                "lat": lat,
                "lon": lon,
                "battery": 88.0,
                "timestamp": Utc::now().to_rfc3339()
            })
            .to_string(),
        ))
        .unwrap()
}

fn operator_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", OPERATOR_TOKEN));
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn telemetry_requires_drone_token() {
    let (app, _state) = setup_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/v1/telemetry")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "drone_id": "X1",
                "lat": 52.0,
                "lon": 21.0,
                "timestamp": Utc::now().to_rfc3339()
            })
            .to_string(),
        ))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/telemetry")
        .header("content-type", "application/json")
        .header("X-Drone-Token", "wrong-token")
        .body(Body::from(
            json!({
                "drone_id": "X1",
                "lat": 52.0,
                "lon": 21.0,
                "timestamp": Utc::now().to_rfc3339()
            })
            .to_string(),
        ))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn telemetry_surfaces_vehicle_as_detected() {
    let (app, state) = setup_app().await;

    let res = app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    // No mission uploaded yet, so the tasking echo is empty.
    assert_eq!(body["role"], Value::Null);
    assert_eq!(body["mission"], Value::Null);

    let snapshot = state.fleet_snapshot(Utc::now());
    assert_eq!(snapshot.drones.len(), 1);
    assert_eq!(snapshot.drones[0].drone_id, "X1");
    assert_eq!(snapshot.drones[0].state.to_string(), "detected");
}

#[tokio::test]
async fn blank_drone_id_is_rejected_with_echo() {
    let (app, state) = setup_app().await;

    let res = app.clone().oneshot(telemetry_request("   ", 52.2, 21.0)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(res).await;
    assert_eq!(body["received"]["lat"], json!(52.2));

    assert!(state.fleet_snapshot(Utc::now()).drones.is_empty());
}

#[tokio::test]
async fn operator_endpoints_require_bearer_token() {
    let (app, _state) = setup_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/v1/fleet")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("GET")
        .uri("/v1/fleet")
        .header("authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn accept_release_lifecycle() {
    let (app, _state) = setup_app().await;

    app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/accept", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["changed"], Value::Bool(true));

    // Idempotent.
    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/accept", None))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["changed"], Value::Bool(false));

    let res = app
        .clone()
        .oneshot(operator_request("GET", "/v1/fleet", None))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["drones"][0]["state"], json!("active"));

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/release", None))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["changed"], Value::Bool(true));

    // Unknown ids are 404.
    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/fleet/ghost/accept", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mission_lifecycle_generates_and_uploads() {
    let (app, _state) = setup_app().await;

    // Two reporting vehicles, both accepted.
    app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();
    app.clone().oneshot(telemetry_request("X2", 52.3, 21.1)).await.unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/accept", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/fleet/X2/accept", None))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for [lat, lon] in [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001], [0.001, 0.0]] {
        let res = app
            .clone()
            .oneshot(operator_request(
                "POST",
                "/v1/mission/vertices",
                Some(json!({ "lat": lat, "lon": lon })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/mission/finish", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["vertices"], json!(4));

    let res = app
        .clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/generate",
            Some(json!({ "spacing_m": 20.0, "policy": "independent" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["degenerate"], Value::Bool(false));
    assert!(body["vehicles"]["X1"]["waypoints"].as_array().unwrap().len() >= 2);
    assert_eq!(body["vehicles"]["X1"]["role"], json!("independent"));

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/mission/upload", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["uploaded"], json!(2));

    // Next telemetry report echoes the tasking.
    let res = app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();
    let body = read_json(res).await;
    assert_eq!(body["role"], json!("independent"));
    assert!(body["mission"]["waypoints"].as_array().unwrap().len() >= 2);

    // Vehicles can also re-fetch their mission directly.
    let req = Request::builder()
        .method("GET")
        .uri("/v1/missions/X2")
        .header("X-Drone-Token", DRONE_TOKEN)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn generate_requires_planned_session() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/generate",
            Some(json!({ "spacing_m": 20.0, "policy": "independent" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn finish_rejects_underfilled_polygon() {
    let (app, _state) = setup_app().await;

    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/vertices",
            Some(json!({ "lat": 0.0, "lon": 0.0 })),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request("POST", "/v1/mission/finish", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn leader_follower_needs_two_vehicles() {
    let (app, _state) = setup_app().await;

    app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/accept", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    for [lat, lon] in [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001]] {
        app.clone()
            .oneshot(operator_request(
                "POST",
                "/v1/mission/vertices",
                Some(json!({ "lat": lat, "lon": lon })),
            ))
            .await
            .unwrap();
    }
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/finish", None))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/generate",
            Some(json!({ "spacing_m": 20.0, "policy": "leader_follower" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stop_with_empty_list_clears_all_missions() {
    let (app, state) = setup_app().await;

    app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();
    app.clone().oneshot(telemetry_request("X2", 52.3, 21.1)).await.unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/fleet/X1/accept", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/fleet/X2/accept", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    for [lat, lon] in [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001], [0.001, 0.0]] {
        app.clone()
            .oneshot(operator_request(
                "POST",
                "/v1/mission/vertices",
                Some(json!({ "lat": lat, "lon": lon })),
            ))
            .await
            .unwrap();
    }
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/finish", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/generate",
            Some(json!({ "spacing_m": 20.0, "policy": "independent" })),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/upload", None))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/stop",
            Some(json!({ "drones": [] })),
        ))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["stopped"], json!(2));
    assert!(state.vehicle_mission("X1").is_none());
    assert!(state.vehicle_mission("X2").is_none());
}

#[tokio::test]
async fn clear_resets_session_to_idle() {
    let (app, state) = setup_app().await;

    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/clear", None))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request("GET", "/v1/mission", None))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["state"], json!("idle"));
    assert!(body["polygon"].as_array().unwrap().is_empty());
    assert_eq!(
        state.session_state(),
        opcon_core::session::SessionState::Idle
    );
}

#[tokio::test]
async fn vertex_edits_are_bounds_checked() {
    let (app, _state) = setup_app().await;

    app.clone()
        .oneshot(operator_request("POST", "/v1/mission/start", None))
        .await
        .unwrap();
    app.clone()
        .oneshot(operator_request(
            "POST",
            "/v1/mission/vertices",
            Some(json!({ "lat": 0.0, "lon": 0.0 })),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(operator_request(
            "PUT",
            "/v1/mission/vertices/5",
            Some(json!({ "lat": 1.0, "lon": 1.0 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(operator_request("DELETE", "/v1/mission/vertices/5", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roster_lists_known_ids() {
    let (app, _state) = setup_app().await;

    app.clone().oneshot(telemetry_request("X2", 52.3, 21.1)).await.unwrap();
    app.clone().oneshot(telemetry_request("X1", 52.2, 21.0)).await.unwrap();

    let res = app
        .clone()
        .oneshot(operator_request("GET", "/v1/roster", None))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["drones"], json!(["X1", "X2"]));
}
