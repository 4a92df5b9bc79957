//! Leader/follower control plane for the SunGate fleet.
//!
//! The fleet runs a simple sun-tracking scheme: the first device to poll
//! becomes the *leader* and physically tracks the target (sun position or
//! brightest light); every other device is a *follower* that mirrors the
//! leader's last reported panel orientation.
//!
//! [`CommandState`] is the single piece of process-wide mutable state.
//! [`ControlPlane`] wraps it in a `tokio::sync::Mutex` with strict
//! acquire-snapshot-release discipline: no external work (in particular no
//! sun-position computation) happens while the lock is held.

pub mod plane;
pub mod state;
pub mod sunpos;

pub use plane::ControlPlane;
pub use state::{CommandState, PollSnapshot, TrackingMode};
pub use sunpos::{SolarEphemeris, SunPosition, SunPositionProvider};
