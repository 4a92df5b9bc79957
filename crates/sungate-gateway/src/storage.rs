//! Storage forwarding seam.
//!
//! Durable persistence lives outside this repo; the gateway only drains
//! the storage inbox into a [`StorageSink`] implementation. The shipped
//! [`LogSink`] records batch sizes, which is enough for deployments that
//! run the database writer as a separate process off the MQTT feed.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

use sungate_protocol::DataPoint;

/// Failure while handing a batch to the storage collaborator.
#[derive(Debug, Error)]
#[error("storage sink failure: {0}")]
pub struct SinkError(pub String);

/// Accepts decoded, timestamp-corrected batches for durable storage.
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn store(&self, batch: &[DataPoint]) -> Result<(), SinkError>;
}

/// Sink that only logs what it receives.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl StorageSink for LogSink {
    async fn store(&self, batch: &[DataPoint]) -> Result<(), SinkError> {
        info!(records = batch.len(), "storage batch received");
        Ok(())
    }
}

/// Drain the storage inbox into the sink until all senders are dropped.
///
/// Sink errors are logged and the forwarder keeps consuming; crashing
/// here would back the ingestion path up into hard request failures.
pub async fn run_storage_forwarder(
    mut inbox: mpsc::Receiver<Vec<DataPoint>>,
    sink: Arc<dyn StorageSink>,
) {
    info!("storage forwarder started");
    while let Some(batch) = inbox.recv().await {
        if let Err(err) = sink.store(&batch).await {
            error!("failed to store telemetry batch: {err}");
        }
    }
    info!("storage inbox closed, forwarder stopping");
}
