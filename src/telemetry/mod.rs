//! Live telemetry: the server's push feed, parsed into samples and kept in a
//! bounded rolling window.

mod buffer;
mod ingestor;
mod sample;
mod stream;

pub use buffer::RingBuffer;
pub use ingestor::Ingestor;
pub use sample::{parse_message, unix_now, TelemetrySample, TELEMETRY_MESSAGE_TYPE};
pub use stream::{StreamEvent, StreamState, TelemetryStream};
