//! Wire protocol for SunGate edge devices.
//!
//! The devices speak a fixed-width little-endian binary format over a
//! request/response transport. This crate owns both directions of that
//! format:
//!
//! - **Telemetry**: 36-byte sensor records, batched behind a
//!   `count + sender_clock` header ([`telemetry`]).
//! - **Commands**: single-ordinal command responses with a per-variant
//!   payload ([`command`]).
//!
//! Everything here is pure: no I/O, no clocks, no shared state. Decoding
//! validates framing strictly and reports [`ProtocolError`] with the
//! expected size so devices can self-correct.

pub mod command;
pub mod error;
pub mod telemetry;

pub use command::{Command, CommandKind, PollRequest};
pub use error::{ProtocolError, Result};
pub use telemetry::{DataPoint, TelemetryBatch, aggregate, BATCH_HEADER_SIZE, RECORD_SIZE};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
