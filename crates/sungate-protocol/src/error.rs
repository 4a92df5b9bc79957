//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding device payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer is too short to even carry the record count.
    #[error("Minimum packet size is 4")]
    ShortPacket,

    /// Buffer length does not match the declared record count.
    #[error("Expected packet size: {expected}")]
    MalformedPacket {
        /// Total size in bytes the buffer should have had.
        expected: usize,
    },

    /// A record timestamp cannot be represented after skew correction.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,
}
