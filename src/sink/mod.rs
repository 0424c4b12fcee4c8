//! C7: `EventSink` capability set — abstract output channel. Variants:
//! memory, file (chunked LZ4 `.qrsdp`), fan-out, wire.

pub mod file;
pub mod reader;
pub mod wire;

pub use file::BinaryFileSink;
pub use reader::EventLogReader;
pub use wire::NetworkWireSink;

use crate::error::Result;
use crate::types::EventRecord;
use tracing::warn;

/// All variants implement three operations: `append`, `flush` (default
/// no-op), `close` (default no-op).
pub trait EventSink: Send {
    fn append(&mut self, record: &EventRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Stores events in an ordered sequence; used for tests and small
/// analysis runs.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub records: Vec<EventRecord>,
}

impl EventSink for InMemorySink {
    fn append(&mut self, record: &EventRecord) -> Result<()> {
        self.records.push(*record);
        Ok(())
    }
}

/// Forwards each event to a list of downstream sinks, best-effort: one
/// sink's failure is caught and logged, the remaining sinks still receive
/// the event, and the producer itself does not see the error.
#[derive(Default)]
pub struct FanOutSink {
    downstream: Vec<Box<dyn EventSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.downstream.push(sink);
    }
}

impl EventSink for FanOutSink {
    fn append(&mut self, record: &EventRecord) -> Result<()> {
        for (idx, sink) in self.downstream.iter_mut().enumerate() {
            if let Err(e) = sink.append(record) {
                warn!(sink_index = idx, error = %e, "fan-out downstream sink failed, continuing");
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.downstream {
            let _ = sink.flush();
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        for sink in &mut self.downstream {
            let _ = sink.close();
        }
        Ok(())
    }
}

/// Sketch of a message-bus sink, out of normative scope: serialises each
/// event as the 26-byte `DiskEventRecord` and hands it to a pluggable
/// publish closure keyed by symbol. No concrete broker client is included
/// — this is a sample of the fan-out contract, not a Kafka integration.
pub struct MessageBusSink<F: FnMut(&str, [u8; crate::types::DISK_EVENT_RECORD_SIZE]) + Send> {
    pub topic_key: String,
    publish: F,
}

impl<F: FnMut(&str, [u8; crate::types::DISK_EVENT_RECORD_SIZE]) + Send> MessageBusSink<F> {
    pub fn new(topic_key: impl Into<String>, publish: F) -> Self {
        MessageBusSink {
            topic_key: topic_key.into(),
            publish,
        }
    }
}

impl<F: FnMut(&str, [u8; crate::types::DISK_EVENT_RECORD_SIZE]) + Send> EventSink for MessageBusSink<F> {
    fn append(&mut self, record: &EventRecord) -> Result<()> {
        let disk = crate::types::DiskEventRecord::from_event_record(record);
        (self.publish)(&self.topic_key, disk.to_bytes());
        Ok(())
    }
}
