//! Command response codec and poll request parsing.
//!
//! A command response is a single ordinal byte followed by a per-variant
//! payload. Only the gateway encodes commands; the device side decodes
//! them, so the encoding must stay byte-exact for interoperability.

use crate::error::{ProtocolError, Result};

/// Serialized size of a poll request (`device_id | hor | ver`).
pub const POLL_REQUEST_SIZE: usize = 12;

/// Wire ordinal of a command.
///
/// `Follower` was appended after the original four variants, so firmware
/// deployed against the old enum keeps its ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    Nop = 0,
    Location = 1,
    LightTracking = 2,
    Stop = 3,
    Follower = 4,
}

impl CommandKind {
    /// Wire ordinal for this kind.
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// A fully-resolved command, built fresh for each poll response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Hold position.
    Nop,
    /// Track the computed sun position (radians).
    Location { azimuth: f32, altitude: f32 },
    /// Track the brightest light source autonomously.
    LightTracking,
    /// Park the panel.
    Stop,
    /// Mirror the leader's reported angle offsets.
    Follower { hor: i32, ver: i32 },
}

impl Command {
    /// Wire ordinal of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Nop => CommandKind::Nop,
            Command::Location { .. } => CommandKind::Location,
            Command::LightTracking => CommandKind::LightTracking,
            Command::Stop => CommandKind::Stop,
            Command::Follower { .. } => CommandKind::Follower,
        }
    }

    /// Encode as `ordinal` plus the variant payload, little-endian.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.kind().ordinal()];
        match self {
            Command::Location { azimuth, altitude } => {
                buf.extend_from_slice(&azimuth.to_le_bytes());
                buf.extend_from_slice(&altitude.to_le_bytes());
            }
            Command::Follower { hor, ver } => {
                buf.extend_from_slice(&hor.to_le_bytes());
                buf.extend_from_slice(&ver.to_le_bytes());
            }
            Command::Nop | Command::LightTracking | Command::Stop => {}
        }
        buf
    }
}

/// A device's poll payload: who is asking and where its panel currently
/// points (degrees x scale, signed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub device_id: u32,
    pub angle_offset_hor: i32,
    pub angle_offset_ver: i32,
}

impl PollRequest {
    /// Decode the fixed 12-byte poll payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != POLL_REQUEST_SIZE {
            return Err(ProtocolError::MalformedPacket {
                expected: POLL_REQUEST_SIZE,
            });
        }
        Ok(Self {
            device_id: u32::from_le_bytes(payload[0..4].try_into().unwrap_or_default()),
            angle_offset_hor: i32::from_le_bytes(payload[4..8].try_into().unwrap_or_default()),
            angle_offset_ver: i32::from_le_bytes(payload[8..12].try_into().unwrap_or_default()),
        })
    }

    /// Encode the poll payload. Device-side counterpart, kept for tests.
    pub fn encode(&self) -> [u8; POLL_REQUEST_SIZE] {
        let mut buf = [0u8; POLL_REQUEST_SIZE];
        buf[0..4].copy_from_slice(&self.device_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.angle_offset_hor.to_le_bytes());
        buf[8..12].copy_from_slice(&self.angle_offset_ver.to_le_bytes());
        buf
    }
}
