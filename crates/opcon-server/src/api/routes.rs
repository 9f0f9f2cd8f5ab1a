//! REST API routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::{self, DroneToken, OperatorToken};
use crate::api::ws;
use crate::config::Config;
use crate::state::{AppState, FleetSnapshot};
use opcon_core::assign::RolePolicy;
use opcon_core::models::{TelemetryRecord, VehicleMission};
use opcon_core::session::GenerateParams;
use opcon_core::{PlanError, SessionError};

/// Create the API router.
pub fn create_router(config: &Config) -> Router<Arc<AppState>> {
    let operator_token = OperatorToken(Arc::new(config.operator_token.clone()));
    let drone_token = DroneToken(Arc::new(config.drone_token.clone()));

    // Vehicle-facing routes (shared drone token)
    let vehicle_routes = Router::new()
        .route("/v1/telemetry", post(receive_telemetry))
        .route("/v1/missions/:drone_id", get(get_mission))
        .layer(middleware::from_fn_with_state(drone_token, auth::require_drone));

    // Operator routes (bearer token)
    let operator_routes = Router::new()
        .route("/v1/fleet", get(get_fleet))
        .route("/v1/roster", get(get_roster))
        .route("/v1/fleet/:drone_id/accept", post(accept_drone))
        .route("/v1/fleet/:drone_id/release", post(release_drone))
        .route("/v1/fleet/:drone_id/select", post(select_drone))
        .route("/v1/mission", get(get_session))
        .route("/v1/mission/start", post(start_mission))
        .route("/v1/mission/vertices", post(add_vertex))
        .route("/v1/mission/vertices/:index", put(move_vertex))
        .route("/v1/mission/vertices/:index", delete(remove_vertex))
        .route("/v1/mission/finish", post(finish_polygon))
        .route("/v1/mission/generate", post(generate_mission))
        .route("/v1/mission/upload", post(upload_missions))
        .route("/v1/mission/stop", post(stop_missions))
        .route("/v1/mission/clear", post(clear_mission))
        .layer(middleware::from_fn_with_state(
            operator_token,
            auth::require_operator,
        ));

    // WebSocket does its own token check (browser clients pass ?token=)
    let ws_route = Router::new().route("/v1/ws", get(ws::ws_handler));

    vehicle_routes.merge(operator_routes).merge(ws_route)
}

// === Request types ===

#[derive(Debug, Deserialize)]
struct VertexRequest {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    spacing_m: f64,
    policy: RolePolicy,
    altitude_m: Option<f64>,
    vehicle_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct StopRequest {
    #[serde(default)]
    drones: Vec<String>,
}

// === Error mapping ===

fn session_error(err: SessionError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::VertexOutOfRange { .. } => StatusCode::NOT_FOUND,
        SessionError::Plan(_) | SessionError::Assign(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

// === Vehicle handlers ===

async fn receive_telemetry(
    State(state): State<Arc<AppState>>,
    Json(record): Json<TelemetryRecord>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(record) = record.clone().normalized() else {
        // Input echoed back so the sender can see what was rejected.
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "Invalid telemetry record",
                "received": record,
            })),
        );
    };

    let reply = state.ingest_telemetry(record).await;
    match serde_json::to_value(&reply) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            tracing::error!("Failed to serialize tasking reply: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal error" })),
            )
        }
    }
}

async fn get_mission(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<VehicleMission>, StatusCode> {
    state
        .vehicle_mission(drone_id.trim())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// === Fleet handlers ===

async fn get_fleet(State(state): State<Arc<AppState>>) -> Json<FleetSnapshot> {
    Json(state.fleet_snapshot(Utc::now()))
}

async fn get_roster(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "drones": state.roster() }))
}

async fn accept_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let changed = state
        .accept(drone_id.trim())
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    if changed {
        tracing::info!("Accepted vehicle {}", drone_id.trim());
    }
    Ok(Json(serde_json::json!({ "accepted": true, "changed": changed })))
}

async fn release_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let changed = state
        .release(drone_id.trim())
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    if changed {
        tracing::info!("Released vehicle {}", drone_id.trim());
    }
    Ok(Json(serde_json::json!({ "accepted": false, "changed": changed })))
}

async fn select_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !state.select(drone_id.trim()) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(serde_json::json!({ "selected": drone_id.trim() })))
}

// === Mission session handlers ===

async fn get_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "state": state.session_state(),
        "polygon": state.session_polygon(),
    }))
}

async fn start_mission(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state.start_drawing().map_err(session_error)?;
    Ok(Json(serde_json::json!({ "state": "drawing" })))
}

async fn add_vertex(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VertexRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let index = state.add_vertex(req.lat, req.lon).map_err(session_error)?;
    Ok(Json(serde_json::json!({ "index": index })))
}

async fn move_vertex(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<VertexRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state
        .move_vertex(index, req.lat, req.lon)
        .map_err(session_error)?;
    Ok(Json(serde_json::json!({ "index": index })))
}

async fn remove_vertex(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state.remove_vertex(index).map_err(session_error)?;
    Ok(Json(serde_json::json!({ "removed": index })))
}

async fn finish_polygon(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let polygon = state.finish_polygon().await.map_err(session_error)?;
    Ok(Json(serde_json::json!({
        "state": "planned",
        "vertices": polygon.len(),
    })))
}

async fn generate_mission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !req.spacing_m.is_finite() || req.spacing_m <= 0.0 {
        return Err(session_error(
            PlanError::InvalidSpacing(req.spacing_m).into(),
        ));
    }
    let params = GenerateParams {
        spacing_m: req.spacing_m,
        policy: req.policy,
        altitude_m: req.altitude_m.unwrap_or(state.config().default_altitude_m),
        vehicle_limit: req.vehicle_limit,
    };
    let generated = state.generate(params).map_err(session_error)?;
    if generated.degenerate {
        tracing::warn!(
            "Coverage plan for mission {} fell back to raw polygon vertices",
            generated.mission_id
        );
    }
    Ok(Json(generated))
}

async fn upload_missions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match state.upload_missions().await {
        Some(count) => {
            tracing::info!("Uploaded missions to {} vehicle(s)", count);
            Ok(Json(serde_json::json!({ "uploaded": count })))
        }
        None => Err((
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "No generated mission to upload",
                "hint": "Call /v1/mission/generate first"
            })),
        )),
    }
}

async fn stop_missions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StopRequest>,
) -> Json<serde_json::Value> {
    let stopped = state.stop_missions(&req.drones).await;
    tracing::info!("Stopped missions on {} vehicle(s)", stopped);
    Json(serde_json::json!({ "stopped": stopped }))
}

async fn clear_mission(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.clear_session().await;
    Json(serde_json::json!({ "state": "idle" }))
}
