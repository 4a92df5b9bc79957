//! The control plane: shared state behind one lock plus the poll path.

use std::sync::Arc;

use chrono::{Duration, FixedOffset, Offset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use sungate_protocol::{Command, CommandKind, PollRequest};

use crate::state::{CommandState, TrackingMode};
use crate::sunpos::SunPositionProvider;

/// Shared handle over the process-wide [`CommandState`].
///
/// Lock discipline is acquire, snapshot, release: the sun-position
/// collaborator is only ever invoked on a snapshot taken under the lock,
/// so critical sections stay O(1) field copies and never await.
#[derive(Clone)]
pub struct ControlPlane {
    state: Arc<Mutex<CommandState>>,
    sun: Arc<dyn SunPositionProvider>,
}

impl ControlPlane {
    /// Create a control plane around an initial state.
    pub fn new(initial: CommandState, sun: Arc<dyn SunPositionProvider>) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
            sun,
        }
    }

    /// Answer one device poll. Never fails.
    pub async fn poll(&self, request: &PollRequest) -> Command {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.apply_poll(request)
        };
        debug!(
            device_id = request.device_id,
            kind = ?snapshot.kind,
            "resolved poll"
        );

        match snapshot.kind {
            CommandKind::Nop => Command::Nop,
            CommandKind::LightTracking => Command::LightTracking,
            CommandKind::Stop => Command::Stop,
            CommandKind::Follower => Command::Follower {
                hor: snapshot.target_angle_offset_hor,
                ver: snapshot.target_angle_offset_ver,
            },
            CommandKind::Location => {
                // The device expects the sun position for local wall-clock
                // time; shift into the site timezone before the ephemeris
                // call, off the snapshot, with the lock already released.
                let local = Utc::now()
                    + Duration::seconds(snapshot.local_timezone.local_minus_utc() as i64);
                let sun = self
                    .sun
                    .position(local, snapshot.latitude, snapshot.longitude)
                    .await;
                Command::Location {
                    azimuth: sun.azimuth as f32,
                    altitude: sun.altitude as f32,
                }
            }
        }
    }

    /// Operator command: track the sun at the given site.
    pub async fn set_location(&self, timeoffset_minutes: i32, latitude: f64, longitude: f64) {
        let local_timezone = FixedOffset::east_opt(timeoffset_minutes * 60).unwrap_or_else(|| {
            warn!(timeoffset_minutes, "timezone offset out of range, using UTC");
            Utc.fix()
        });
        let mut state = self.state.lock().await;
        state.mode = TrackingMode::Location;
        state.latitude = latitude;
        state.longitude = longitude;
        state.local_timezone = local_timezone;
    }

    /// Operator command: autonomous light tracking.
    pub async fn set_light_tracking(&self) {
        self.state.lock().await.mode = TrackingMode::LightTracking;
    }

    /// Operator command: park all panels.
    pub async fn set_stop(&self) {
        self.state.lock().await.mode = TrackingMode::Stop;
    }

    /// Copy of the current state, for status reporting.
    pub async fn snapshot(&self) -> CommandState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunpos::SunPosition;
    use async_trait::async_trait;
    use chrono::DateTime;

    struct FixedSun;

    #[async_trait]
    impl SunPositionProvider for FixedSun {
        async fn position(&self, _at: DateTime<Utc>, _lat: f64, _lon: f64) -> SunPosition {
            SunPosition {
                azimuth: 1.0,
                altitude: 0.5,
            }
        }
    }

    fn plane() -> ControlPlane {
        ControlPlane::new(CommandState::default(), Arc::new(FixedSun))
    }

    fn request(device_id: u32) -> PollRequest {
        PollRequest {
            device_id,
            angle_offset_hor: 0,
            angle_offset_ver: 0,
        }
    }

    #[tokio::test]
    async fn fresh_leader_gets_nop() {
        let plane = plane();
        assert_eq!(plane.poll(&request(7)).await, Command::Nop);
    }

    #[tokio::test]
    async fn follower_under_location_gets_zero_offsets() {
        let plane = plane();
        plane.poll(&request(7)).await;
        plane.set_location(60, 48.1, 11.6).await;

        // Leader has not reported any non-zero offset yet.
        let command = plane.poll(&request(9)).await;
        assert_eq!(command, Command::Follower { hor: 0, ver: 0 });
    }

    #[tokio::test]
    async fn leader_under_location_gets_sun_position() {
        let plane = plane();
        plane.poll(&request(7)).await;
        plane.set_location(0, 48.1, 11.6).await;

        match plane.poll(&request(7)).await {
            Command::Location { azimuth, altitude } => {
                assert!((azimuth - 1.0).abs() < f32::EPSILON);
                assert!((altitude - 0.5).abs() < f32::EPSILON);
            }
            other => panic!("expected Location, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_reaches_followers() {
        let plane = plane();
        plane.poll(&request(7)).await;
        plane.set_stop().await;
        assert_eq!(plane.poll(&request(9)).await, Command::Stop);
    }
}
