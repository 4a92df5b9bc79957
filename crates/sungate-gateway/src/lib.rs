//! SunGate gateway: device-facing server, ingestion fan-out, and the
//! windowed aggregation relay.
//!
//! Request flow:
//!
//! ```text
//! device ──GET /command────────► ControlPlane (sungate-control)
//! device ──POST /sensor/data──► decode ─► skew-correct ─► ┬─► storage inbox
//!                                                         └─► relay inbox
//! relay inbox ──► AggregationRelay ──window──► Publisher (MQTT)
//! storage inbox ──► storage forwarder ──► StorageSink (collaborator)
//! ```
//!
//! Codec and framing errors stop at the request handler; a full inbox is
//! fatal for that request (never a silent drop); a failed publish is
//! logged and the aggregate dropped, the relay being the intentionally
//! lossy path.

pub mod config;
pub mod error;
pub mod ingest;
pub mod publish;
pub mod relay;
pub mod server;
pub mod storage;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use ingest::Inboxes;
pub use publish::{MqttPublisher, PublishError, Publisher};
pub use relay::AggregationRelay;
pub use server::{router, AppState};
pub use storage::{run_storage_forwarder, LogSink, StorageSink};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
