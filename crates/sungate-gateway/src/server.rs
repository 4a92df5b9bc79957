//! Device-facing HTTP surface and the operator control API.
//!
//! Device endpoints carry raw binary bodies (the devices are
//! microcontrollers; the framing is the fixed-width codec, not JSON):
//!
//! - `GET /command` - 12-byte poll request in, encoded command out.
//! - `POST /sensor/data` - telemetry batch in, `ok` out.
//! - `GET /sensor/data` - static placeholder, health-check style.
//!
//! Operator endpoints are JSON and mutate the stored tracking mode:
//! `POST /api/v1/location`, `POST /api/v1/light_tracking`,
//! `POST /api/v1/stop`, plus `GET /api/health`.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use sungate_control::ControlPlane;
use sungate_protocol::PollRequest;

use crate::error::GatewayError;
use crate::ingest::{decode_upload, Inboxes};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub control: ControlPlane,
    pub inboxes: Inboxes,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/command", get(command_handler))
        .route("/sensor/data", get(sensor_data_placeholder).post(sensor_data_handler))
        .route("/api/v1/location", post(location_handler))
        .route("/api/v1/light_tracking", post(light_tracking_handler))
        .route("/api/v1/stop", post(stop_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// Answer a device poll with an encoded command.
pub async fn command_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request = match PollRequest::decode(&body) {
        Ok(request) => request,
        Err(err) => {
            // A wrong-sized poll body is a contract violation by the
            // device firmware, not a condition this layer recovers from.
            warn!(len = body.len(), "rejected malformed poll request");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let command = state.control.poll(&request).await;
    debug!(device_id = request.device_id, ?command, "answering poll");
    command.encode().into_response()
}

/// Accept a telemetry upload, fan it out, acknowledge.
pub async fn sensor_data_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let arrival_time = Utc::now();

    let batch = match decode_upload(&body, arrival_time) {
        Ok(batch) => batch,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    match state.inboxes.dispatch(batch) {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err @ GatewayError::QueueSaturated(_)) | Err(err @ GatewayError::QueueClosed(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
        }
    }
}

/// Placeholder body kept for device-side connectivity probes.
pub async fn sensor_data_placeholder() -> &'static str {
    "some response payload"
}

/// Operator request to start sun tracking at a site.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRequest {
    /// Local UTC offset in minutes.
    pub timeoffset: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// Switch the fleet to sun-position tracking.
pub async fn location_handler(
    State(state): State<AppState>,
    Json(request): Json<LocationRequest>,
) -> StatusCode {
    state
        .control
        .set_location(request.timeoffset, request.latitude, request.longitude)
        .await;
    StatusCode::OK
}

/// Switch the fleet to autonomous light tracking.
pub async fn light_tracking_handler(State(state): State<AppState>) -> StatusCode {
    state.control.set_light_tracking().await;
    StatusCode::OK
}

/// Park all panels.
pub async fn stop_handler(State(state): State<AppState>) -> StatusCode {
    state.control.set_stop().await;
    StatusCode::OK
}

/// Basic health check.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "sungate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
