//! Request/response contract with the remote inference service.

mod client;
pub mod protocol;

pub use client::{InferenceClient, InferenceService};
pub use protocol::{
    BackendDescriptor, InferenceRequest, InferenceResponse, MetricStats, MetricsSummary,
    SummaryBucket,
};
