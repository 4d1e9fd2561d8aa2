//! JSON shapes exchanged with the inference service.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::game::{Board, Player, COLS};

/// An inference backend the service can route to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub key: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// Body of `POST /infer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub board: Board,
    pub current_player: Player,
    pub backend: String,
}

impl InferenceRequest {
    pub fn new(board: Board, mover: Player, backend: impl Into<String>) -> Self {
        InferenceRequest {
            board,
            current_player: mover,
            backend: backend.into(),
        }
    }
}

/// Reply to `POST /infer`.
///
/// `backend` is the backend that actually served the call, which may differ
/// from the one requested; latency is attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub backend: String,
    pub model: String,
    pub policy: Vec<f64>,
    pub value: f64,
    pub latency_ms: f64,
    #[serde(default)]
    pub extras: HashMap<String, f64>,
}

impl InferenceResponse {
    /// Reject replies whose policy does not cover every column.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.policy.len() != COLS {
            return Err(format!(
                "policy has {} entries, expected {}",
                self.policy.len(),
                COLS
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub p50: f64,
    pub p95: f64,
    pub avg: f64,
    pub count: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryBucket {
    pub latency_ms: MetricStats,
    pub value: MetricStats,
    pub fanout: MetricStats,
}

/// Server-side aggregates over the recent telemetry window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub overall: SummaryBucket,
    #[serde(default)]
    pub by_backend: BTreeMap<String, SummaryBucket>,
}

/// Error body of a non-2xx reply.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Human-readable detail, if the server sent one.
    pub(crate) fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}
