use super::buffer::RingBuffer;
use super::sample::TelemetrySample;
use super::stream::{StreamEvent, StreamState};

/// Folds stream events into the current connection state and a bounded
/// window of recent samples. Owned by exactly one task.
#[derive(Debug, Clone)]
pub struct Ingestor {
    samples: RingBuffer<TelemetrySample>,
    state: StreamState,
    received: u64,
}

impl Ingestor {
    pub fn new(capacity: usize) -> Self {
        Ingestor {
            samples: RingBuffer::new(capacity),
            state: StreamState::Connecting,
            received: 0,
        }
    }

    /// Apply one event. Returns true if the sample window changed.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::State(state) => {
                self.state = state;
                false
            }
            StreamEvent::Sample(sample) => {
                self.samples.push(sample);
                self.received += 1;
                true
            }
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn samples(&self) -> &RingBuffer<TelemetrySample> {
        &self.samples
    }

    /// Samples currently held, oldest first.
    pub fn snapshot(&self) -> Vec<TelemetrySample> {
        self.samples.to_vec()
    }

    /// Total samples ever ingested, including evicted ones.
    pub fn received(&self) -> u64 {
        self.received
    }
}
