//! Telemetry record and batch codec.
//!
//! Record layout (little-endian, 36 bytes):
//!
//! ```text
//! device_id:u32 | ts:u64 | temperature:f32 | photoresistor:u32
//!              | infrared:u32 | voltage:u32 | current:u32 | power:u32
//! ```
//!
//! Upload framing: `count:u32 | sender_clock:u64 | count x record`.
//! The declared count is read first and used to compute the expected
//! buffer size before any record is parsed.

use chrono::{DateTime, Utc};

use crate::error::{ProtocolError, Result};

/// Serialized size of one telemetry record in bytes.
pub const RECORD_SIZE: usize = 4 + 8 + 4 * 6;

/// Size of the batch header (`count:u32 | sender_clock:u64`).
pub const BATCH_HEADER_SIZE: usize = 4 + 8;

/// One telemetry sample from a device.
///
/// Constructed by decoding a wire record; the timestamp is rewritten once
/// by the ingestion layer (clock-skew correction) and the point is
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Identifies the physical unit.
    pub device_id: u32,
    /// Sample instant, UTC.
    pub timestamp: DateTime<Utc>,
    /// Board temperature, degrees Celsius.
    pub temperature: f32,
    /// Photoresistor reading, raw ADC counts.
    pub photoresistor: u32,
    /// Infrared sensor reading, raw ADC counts.
    pub infrared: u32,
    /// Bus voltage, raw sensor units.
    pub voltage: u32,
    /// Current draw, raw sensor units.
    pub current: u32,
    /// Power draw, raw sensor units.
    pub power: u32,
}

impl DataPoint {
    /// Encode into the 36-byte wire record.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.device_id.to_le_bytes());
        buf[4..12].copy_from_slice(&(self.timestamp.timestamp().max(0) as u64).to_le_bytes());
        buf[12..16].copy_from_slice(&self.temperature.to_le_bytes());
        buf[16..20].copy_from_slice(&self.photoresistor.to_le_bytes());
        buf[20..24].copy_from_slice(&self.infrared.to_le_bytes());
        buf[24..28].copy_from_slice(&self.voltage.to_le_bytes());
        buf[28..32].copy_from_slice(&self.current.to_le_bytes());
        buf[32..36].copy_from_slice(&self.power.to_le_bytes());
        buf
    }

    /// Decode one wire record.
    ///
    /// The caller guarantees `buf` is exactly [`RECORD_SIZE`] bytes; batch
    /// framing is validated before any record is sliced out.
    fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), RECORD_SIZE);
        let secs = u64::from_le_bytes(buf[4..12].try_into().unwrap_or_default());
        Self {
            device_id: u32::from_le_bytes(buf[0..4].try_into().unwrap_or_default()),
            timestamp: DateTime::from_timestamp(secs as i64, 0)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            temperature: f32::from_le_bytes(buf[12..16].try_into().unwrap_or_default()),
            photoresistor: u32::from_le_bytes(buf[16..20].try_into().unwrap_or_default()),
            infrared: u32::from_le_bytes(buf[20..24].try_into().unwrap_or_default()),
            voltage: u32::from_le_bytes(buf[24..28].try_into().unwrap_or_default()),
            current: u32::from_le_bytes(buf[28..32].try_into().unwrap_or_default()),
            power: u32::from_le_bytes(buf[32..36].try_into().unwrap_or_default()),
        }
    }
}

/// A decoded upload: the sender's own clock at send time plus the records.
///
/// Timestamps in `records` are still device-relative here; the ingestion
/// layer translates them onto the gateway clock.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryBatch {
    /// Unix seconds of the device clock when the batch was sent.
    pub sender_clock: u64,
    /// Records in the order the device buffered them.
    pub records: Vec<DataPoint>,
}

impl TelemetryBatch {
    /// Decode an upload payload.
    ///
    /// Fails with [`ProtocolError::ShortPacket`] below 4 bytes and
    /// [`ProtocolError::MalformedPacket`] whenever the buffer length does
    /// not exactly equal `4 + 8 + count * 36`.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 4 {
            return Err(ProtocolError::ShortPacket);
        }

        let count = u32::from_le_bytes(payload[0..4].try_into().unwrap_or_default()) as usize;
        let expected = BATCH_HEADER_SIZE + count * RECORD_SIZE;
        if payload.len() != expected {
            return Err(ProtocolError::MalformedPacket { expected });
        }

        let sender_clock = u64::from_le_bytes(payload[4..12].try_into().unwrap_or_default());

        let mut records = Vec::with_capacity(count);
        let mut index = BATCH_HEADER_SIZE;
        while index < payload.len() {
            records.push(DataPoint::decode(&payload[index..index + RECORD_SIZE]));
            index += RECORD_SIZE;
        }

        Ok(Self {
            sender_clock,
            records,
        })
    }

    /// Encode into an upload payload. Used by interop tests and device
    /// simulators; the gateway itself only decodes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BATCH_HEADER_SIZE + self.records.len() * RECORD_SIZE);
        buf.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.sender_clock.to_le_bytes());
        for record in &self.records {
            buf.extend_from_slice(&record.encode());
        }
        buf
    }
}

/// Collapse records for one device into a single representative sample.
///
/// `device_id` and `timestamp` come from the first record (arrival order);
/// numeric fields are arithmetic means, with integer fields rounded to the
/// nearest count and the float field left unrounded. Returns `None` for an
/// empty slice.
pub fn aggregate(records: &[DataPoint]) -> Option<DataPoint> {
    let first = records.first()?;
    let n = records.len() as f64;

    let mean_u32 = |field: fn(&DataPoint) -> u32| -> u32 {
        let sum: u64 = records.iter().map(|r| field(r) as u64).sum();
        (sum as f64 / n).round() as u32
    };

    let temperature_sum: f64 = records.iter().map(|r| r.temperature as f64).sum();

    Some(DataPoint {
        device_id: first.device_id,
        timestamp: first.timestamp,
        temperature: (temperature_sum / n) as f32,
        photoresistor: mean_u32(|r| r.photoresistor),
        infrared: mean_u32(|r| r.infrared),
        voltage: mean_u32(|r| r.voltage),
        current: mean_u32(|r| r.current),
        power: mean_u32(|r| r.power),
    })
}
