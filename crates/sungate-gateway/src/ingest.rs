//! Telemetry ingestion: decode, clock-skew correction, two-queue fan-out.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error};

use sungate_protocol::{DataPoint, ProtocolError, TelemetryBatch};

use crate::error::GatewayError;

/// Senders for the two independent consumers of decoded telemetry.
///
/// Both receive every corrected batch unchanged as a unit; neither send
/// may starve the other, so the handler performs both before returning an
/// acknowledgement.
#[derive(Clone)]
pub struct Inboxes {
    storage: mpsc::Sender<Vec<DataPoint>>,
    relay: mpsc::Sender<Vec<DataPoint>>,
}

impl Inboxes {
    /// Create both bounded inboxes, returning the receivers for the
    /// consumer tasks.
    pub fn new(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<Vec<DataPoint>>,
        mpsc::Receiver<Vec<DataPoint>>,
    ) {
        let (storage_tx, storage_rx) = mpsc::channel(capacity);
        let (relay_tx, relay_rx) = mpsc::channel(capacity);
        (
            Self {
                storage: storage_tx,
                relay: relay_tx,
            },
            storage_rx,
            relay_rx,
        )
    }

    /// Fan one corrected batch out to both consumers.
    ///
    /// Enqueueing is non-blocking; a full inbox fails the request rather
    /// than dropping the batch on the floor.
    ///
    /// The two sends are not atomic: when the storage send succeeds and
    /// the relay send then fails, the batch is already on the durable
    /// path, so a client retrying the resulting 503 can duplicate records
    /// there. The durable consumer must tolerate replays (the relay path
    /// is lossy anyway).
    pub fn dispatch(&self, batch: Vec<DataPoint>) -> Result<(), GatewayError> {
        self.storage
            .try_send(batch.clone())
            .map_err(|err| queue_error(err, "storage"))?;
        self.relay
            .try_send(batch)
            .map_err(|err| queue_error(err, "relay"))?;
        Ok(())
    }
}

fn queue_error(err: mpsc::error::TrySendError<Vec<DataPoint>>, name: &'static str) -> GatewayError {
    let mapped = match err {
        mpsc::error::TrySendError::Full(_) => GatewayError::QueueSaturated(name),
        mpsc::error::TrySendError::Closed(_) => GatewayError::QueueClosed(name),
    };
    error!(queue = name, "failed to enqueue telemetry batch: {mapped}");
    mapped
}

/// Decode an upload payload and translate each record's timestamp onto
/// the gateway clock.
///
/// The device reports its own clock at send time (`sender_clock`); the
/// age of each sample relative to that clock is re-anchored at
/// `arrival_time`, compensating for however stale the device clock is.
/// Network latency is deliberately not modeled.
///
/// A record whose corrected timestamp falls outside the representable
/// range fails the whole upload with
/// [`ProtocolError::TimestampOutOfRange`].
pub fn decode_upload(
    payload: &[u8],
    arrival_time: DateTime<Utc>,
) -> Result<Vec<DataPoint>, ProtocolError> {
    let batch = TelemetryBatch::decode(payload)?;
    let sender_clock = DateTime::from_timestamp(batch.sender_clock as i64, 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let mut corrected = Vec::with_capacity(batch.records.len());
    for mut point in batch.records {
        let age = sender_clock - point.timestamp;
        point.timestamp = arrival_time
            .checked_sub_signed(age)
            .ok_or(ProtocolError::TimestampOutOfRange)?;
        corrected.push(point);
    }

    debug!(records = corrected.len(), "decoded telemetry upload");
    Ok(corrected)
}
