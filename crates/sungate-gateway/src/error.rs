//! Gateway-side error types.

use thiserror::Error;

/// Errors raised on the ingestion path past the codec boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// An inbox queue was full at enqueue time. Fatal for the current
    /// request: failing loudly beats silently dropping data bound for
    /// durable storage.
    #[error("inbox queue saturated: {0}")]
    QueueSaturated(&'static str),

    /// An inbox queue was closed, meaning its consumer task is gone.
    #[error("inbox queue closed: {0}")]
    QueueClosed(&'static str),
}
