//! Per-device windowed aggregation relay.
//!
//! Consumes decoded batches from the relay inbox, buffers samples per
//! device, and on window rollover publishes a single aggregated record
//! per device. Trades up to one window of latency for bounded downstream
//! volume.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use sungate_protocol::{aggregate, DataPoint};

use crate::publish::Publisher;

/// Open aggregation window for one device.
#[derive(Debug)]
struct DeviceWindow {
    /// Exclusive upper bound: a record at exactly `window_end` belongs to
    /// the next window.
    window_end: DateTime<Utc>,
    buffer: Vec<DataPoint>,
}

/// The relay worker. One long-lived task loops on [`AggregationRelay::run`].
pub struct AggregationRelay {
    inbox: mpsc::Receiver<Vec<DataPoint>>,
    publisher: Arc<dyn Publisher>,
    window: Duration,
    devices: HashMap<u32, DeviceWindow>,
}

impl AggregationRelay {
    pub fn new(
        inbox: mpsc::Receiver<Vec<DataPoint>>,
        publisher: Arc<dyn Publisher>,
        window: Duration,
    ) -> Self {
        Self {
            inbox,
            publisher,
            window,
            devices: HashMap::new(),
        }
    }

    /// Consume the inbox until all senders are dropped.
    pub async fn run(mut self) {
        info!(window_secs = self.window.num_seconds(), "aggregation relay started");
        while let Some(batch) = self.inbox.recv().await {
            let finalized = self.ingest_batch(batch);
            for point in finalized {
                // At-most-once: a failed publish drops the aggregate and
                // the relay keeps running.
                if let Err(err) = self.publisher.publish(&point).await {
                    error!(device_id = point.device_id, "failed to publish aggregate: {err}");
                }
            }
        }
        info!("relay inbox closed, aggregation relay stopping");
    }

    /// Window one batch, returning every aggregate whose window closed.
    ///
    /// The batch is partitioned by device and each sub-batch sorted by
    /// timestamp first, so out-of-order arrival within a batch cannot
    /// reorder a device's stream.
    fn ingest_batch(&mut self, batch: Vec<DataPoint>) -> Vec<DataPoint> {
        let mut by_device: HashMap<u32, Vec<DataPoint>> = HashMap::new();
        for point in batch {
            by_device.entry(point.device_id).or_default().push(point);
        }

        let mut finalized = Vec::new();
        for (device_id, mut points) in by_device {
            points.sort_by_key(|p| p.timestamp);
            for point in points {
                if let Some(done) = self.ingest_point(device_id, point) {
                    finalized.push(done);
                }
            }
        }
        finalized
    }

    /// Feed one record into its device window; returns the finalized
    /// aggregate when the record rolls the window over.
    fn ingest_point(&mut self, device_id: u32, point: DataPoint) -> Option<DataPoint> {
        // A timestamp so close to the end of the representable range that
        // no window can be anchored past it cannot be windowed; drop the
        // sample and keep the worker alive.
        let Some(next_end) = point.timestamp.checked_add_signed(self.window) else {
            warn!(
                device_id,
                timestamp = %point.timestamp,
                "sample timestamp out of windowing range, dropped"
            );
            return None;
        };
        let open = self
            .devices
            .entry(device_id)
            .or_insert_with(|| DeviceWindow {
                window_end: next_end,
                buffer: Vec::new(),
            });

        // An existing window always holds at least one sample; an empty
        // buffer means the entry was just created for this record.
        if open.buffer.is_empty() {
            open.buffer.push(point);
            return None;
        }

        // Strict `<`: a record exactly at window_end opens the next window.
        if point.timestamp < open.window_end {
            open.buffer.push(point);
            return None;
        }

        let done = aggregate(&open.buffer);
        debug!(device_id, samples = open.buffer.len(), "window closed");
        open.window_end = next_end;
        open.buffer = vec![point];
        done
    }
}
