//! End-to-end scenarios against the request handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use sungate_control::{CommandState, ControlPlane, SolarEphemeris, TrackingMode};
use sungate_gateway::server::{
    command_handler, light_tracking_handler, location_handler, sensor_data_handler, stop_handler,
    LocationRequest,
};
use sungate_gateway::{AppState, Inboxes};
use sungate_protocol::{DataPoint, PollRequest, TelemetryBatch};

fn test_state(
    capacity: usize,
) -> (
    AppState,
    mpsc::Receiver<Vec<DataPoint>>,
    mpsc::Receiver<Vec<DataPoint>>,
) {
    let (inboxes, storage_rx, relay_rx) = Inboxes::new(capacity);
    let control = ControlPlane::new(CommandState::default(), Arc::new(SolarEphemeris));
    (AppState { control, inboxes }, storage_rx, relay_rx)
}

fn sample(device_id: u32, secs: i64) -> DataPoint {
    DataPoint {
        device_id,
        timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
        temperature: 21.5,
        photoresistor: 200,
        infrared: 10,
        voltage: 5,
        current: 1,
        power: 5,
    }
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn upload_reaches_both_inboxes_with_corrected_timestamp() {
    let (state, mut storage_rx, mut relay_rx) = test_state(4);

    // Sample taken five seconds before the device sent the batch.
    let sender_clock = 1_700_000_000u64;
    let payload = TelemetryBatch {
        sender_clock,
        records: vec![sample(42, sender_clock as i64 - 5)],
    }
    .encode();

    let before = Utc::now();
    let response = sensor_data_handler(State(state), Bytes::from(payload))
        .await
        .into_response();
    let after = Utc::now();
    assert_eq!(response.status(), StatusCode::OK);

    for rx in [&mut storage_rx, &mut relay_rx] {
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].device_id, 42);
        assert!((batch[0].temperature - 21.5).abs() < f32::EPSILON);
        // corrected = arrival - 5 s, with arrival taken inside the handler.
        assert!(batch[0].timestamp >= before - Duration::seconds(5));
        assert!(batch[0].timestamp <= after - Duration::seconds(5));
    }
}

#[tokio::test]
async fn upload_with_wrong_size_cites_expected_bytes() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    // Declares two records but carries one: expected 4 + 8 + 2 * 36 = 84.
    let mut payload = Vec::new();
    payload.extend_from_slice(&2u32.to_le_bytes());
    payload.extend_from_slice(&0u64.to_le_bytes());
    payload.extend_from_slice(&sample(1, 0).encode());

    let response = sensor_data_handler(State(state), Bytes::from(payload))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Expected packet size: 84");
}

#[tokio::test]
async fn upload_below_four_bytes_is_rejected() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    let response = sensor_data_handler(State(state), Bytes::from_static(&[1, 2, 3]))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Minimum packet size is 4");
}

#[tokio::test]
async fn upload_with_unrepresentable_timestamp_is_rejected() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    // A zeroed device clock with a sample at the far end of the
    // representable range would overflow the skew correction.
    let payload = TelemetryBatch {
        sender_clock: 0,
        records: vec![sample(1, DateTime::<Utc>::MAX_UTC.timestamp())],
    }
    .encode();

    let response = sensor_data_handler(State(state), Bytes::from(payload))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Timestamp out of range");
}

#[tokio::test]
async fn saturated_inbox_fails_the_request() {
    // Capacity one and nobody draining: the second upload must fail loudly.
    let (state, _storage_rx, _relay_rx) = test_state(1);

    let payload = TelemetryBatch {
        sender_clock: 100,
        records: vec![sample(1, 95)],
    }
    .encode();

    let first = sensor_data_handler(State(state.clone()), Bytes::from(payload.clone()))
        .await
        .into_response();
    assert_eq!(first.status(), StatusCode::OK);

    let second = sensor_data_handler(State(state), Bytes::from(payload))
        .await
        .into_response();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn first_leader_gets_nop_then_follower_sees_zero_offsets() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    // Device 7 polls first and becomes leader under the default Nop mode.
    let poll7 = PollRequest {
        device_id: 7,
        angle_offset_hor: 0,
        angle_offset_ver: 0,
    };
    let response = command_handler(State(state.clone()), Bytes::copy_from_slice(&poll7.encode()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(body.as_ref(), &[0]); // Nop

    // Operator switches to sun tracking.
    let status = location_handler(
        State(state.clone()),
        Json(LocationRequest {
            timeoffset: 60,
            latitude: 48.137,
            longitude: 11.575,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Device 9 is a follower; the leader has not reported any offset yet.
    let poll9 = PollRequest {
        device_id: 9,
        angle_offset_hor: 33,
        angle_offset_ver: -12,
    };
    let response = command_handler(State(state), Bytes::copy_from_slice(&poll9.encode()))
        .await
        .into_response();
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(body.len(), 9);
    assert_eq!(body[0], 4); // Follower ordinal
    assert_eq!(&body[1..5], &0i32.to_le_bytes());
    assert_eq!(&body[5..9], &0i32.to_le_bytes());
}

#[tokio::test]
async fn light_tracking_endpoint_switches_the_stored_mode() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    let status = light_tracking_handler(State(state.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        state.control.snapshot().await.mode,
        TrackingMode::LightTracking
    );
}

#[tokio::test]
async fn stop_endpoint_parks_the_fleet() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    state.control.set_light_tracking().await;
    let status = stop_handler(State(state.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.control.snapshot().await.mode, TrackingMode::Stop);
}

#[tokio::test]
async fn malformed_poll_body_is_rejected() {
    let (state, _storage_rx, _relay_rx) = test_state(4);

    let response = command_handler(State(state), Bytes::from_static(&[0u8; 5]))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
