//! Shared command state and the per-poll resolution algorithm.

use chrono::{FixedOffset, Offset, Utc};
use sungate_protocol::{CommandKind, PollRequest};

/// Operator-selected tracking mode.
///
/// This is the *stored* command. `Follower` deliberately has no variant
/// here: it is a response-time classification computed per poll, never a
/// state an operator can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// Hold position.
    #[default]
    Nop,
    /// Follow the computed sun position.
    Location,
    /// Follow the brightest light source.
    LightTracking,
    /// Park all panels.
    Stop,
}

impl TrackingMode {
    /// The wire ordinal this mode resolves to when sent verbatim.
    pub fn kind(self) -> CommandKind {
        match self {
            TrackingMode::Nop => CommandKind::Nop,
            TrackingMode::Location => CommandKind::Location,
            TrackingMode::LightTracking => CommandKind::LightTracking,
            TrackingMode::Stop => CommandKind::Stop,
        }
    }
}

/// Process-wide control state. One instance per process, lifetime =
/// process lifetime, guarded by a single exclusive lock.
#[derive(Debug, Clone)]
pub struct CommandState {
    /// Current operator command.
    pub mode: TrackingMode,
    /// First device to poll; never cleared once set.
    pub leader_device_id: Option<u32>,
    /// Leader's last reported horizontal offset (degrees x scale).
    pub target_angle_offset_hor: i32,
    /// Leader's last reported vertical offset (degrees x scale).
    pub target_angle_offset_ver: i32,
    /// Site latitude, degrees.
    pub latitude: f64,
    /// Site longitude, degrees.
    pub longitude: f64,
    /// Local timezone of the installation site.
    pub local_timezone: FixedOffset,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            mode: TrackingMode::Nop,
            leader_device_id: None,
            target_angle_offset_hor: 0,
            target_angle_offset_ver: 0,
            latitude: 0.0,
            longitude: 0.0,
            local_timezone: Utc.fix(),
        }
    }
}

/// O(1) copy of the fields a poll response needs, taken while the lock is
/// held. All further work (sun position, encoding) runs off this snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSnapshot {
    /// The outgoing command kind resolved for this device.
    pub kind: CommandKind,
    pub target_angle_offset_hor: i32,
    pub target_angle_offset_ver: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub local_timezone: FixedOffset,
}

impl CommandState {
    /// Resolve one device poll. Must be called under the state lock.
    ///
    /// 1. First poller becomes leader (first-writer-wins, no re-election).
    /// 2. The leader's reported offsets become the shared target and it
    ///    receives the stored mode verbatim.
    /// 3. Followers receive `Follower` while the stored mode is a tracking
    ///    mode, otherwise the stored mode verbatim (`Stop` propagates).
    pub fn apply_poll(&mut self, request: &PollRequest) -> PollSnapshot {
        let leader = *self.leader_device_id.get_or_insert(request.device_id);

        let kind = if leader == request.device_id {
            self.target_angle_offset_hor = request.angle_offset_hor;
            self.target_angle_offset_ver = request.angle_offset_ver;
            self.mode.kind()
        } else {
            match self.mode {
                TrackingMode::Location | TrackingMode::LightTracking => CommandKind::Follower,
                other => other.kind(),
            }
        };

        PollSnapshot {
            kind,
            target_angle_offset_hor: self.target_angle_offset_hor,
            target_angle_offset_ver: self.target_angle_offset_ver,
            latitude: self.latitude,
            longitude: self.longitude,
            local_timezone: self.local_timezone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(device_id: u32, hor: i32, ver: i32) -> PollRequest {
        PollRequest {
            device_id,
            angle_offset_hor: hor,
            angle_offset_ver: ver,
        }
    }

    #[test]
    fn first_poller_becomes_leader_and_stays_leader() {
        let mut state = CommandState::default();
        state.apply_poll(&poll(7, 0, 0));
        assert_eq!(state.leader_device_id, Some(7));

        // Other devices never displace the leader.
        state.apply_poll(&poll(9, 5, 5));
        state.apply_poll(&poll(11, 1, 1));
        assert_eq!(state.leader_device_id, Some(7));
    }

    #[test]
    fn leader_reports_become_shared_target() {
        let mut state = CommandState::default();
        state.apply_poll(&poll(7, 0, 0));
        state.apply_poll(&poll(7, -30, 45));
        assert_eq!(state.target_angle_offset_hor, -30);
        assert_eq!(state.target_angle_offset_ver, 45);

        // A follower's reported position is ignored.
        state.apply_poll(&poll(9, 999, 999));
        assert_eq!(state.target_angle_offset_hor, -30);
        assert_eq!(state.target_angle_offset_ver, 45);
    }

    #[test]
    fn follower_is_classified_under_tracking_modes() {
        let mut state = CommandState {
            mode: TrackingMode::Location,
            ..CommandState::default()
        };
        state.apply_poll(&poll(7, 10, 20));

        let snapshot = state.apply_poll(&poll(9, 0, 0));
        assert_eq!(snapshot.kind, CommandKind::Follower);
        assert_eq!(snapshot.target_angle_offset_hor, 10);
        assert_eq!(snapshot.target_angle_offset_ver, 20);

        state.mode = TrackingMode::LightTracking;
        assert_eq!(state.apply_poll(&poll(9, 0, 0)).kind, CommandKind::Follower);
    }

    #[test]
    fn stop_propagates_to_followers_verbatim() {
        let mut state = CommandState {
            mode: TrackingMode::Stop,
            ..CommandState::default()
        };
        state.apply_poll(&poll(7, 0, 0));
        assert_eq!(state.apply_poll(&poll(9, 0, 0)).kind, CommandKind::Stop);
    }

    #[test]
    fn leader_receives_stored_mode() {
        let mut state = CommandState {
            mode: TrackingMode::Location,
            ..CommandState::default()
        };
        assert_eq!(state.apply_poll(&poll(7, 0, 0)).kind, CommandKind::Location);
    }
}
