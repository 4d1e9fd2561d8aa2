use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MalformedTelemetry;

/// Message tag carried by pushed telemetry records.
pub const TELEMETRY_MESSAGE_TYPE: &str = "telemetry";

/// One observed inference call, as pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub backend: String,
    pub latency_ms: f64,
    pub value: f64,
    pub fanout: Option<f64>,
    /// Seconds since the Unix epoch. Server time when the record carried
    /// one, local arrival time otherwise.
    pub ts: f64,
    /// Any other fields of the record.
    pub extras: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    backend: String,
    latency_ms: f64,
    value: f64,
    #[serde(default)]
    fanout: Option<f64>,
    #[serde(default)]
    ts: Option<f64>,
    #[serde(flatten)]
    extras: HashMap<String, Value>,
}

/// Parse one pushed message into a sample.
///
/// Only `{"type": "telemetry", "record": {...}}` is accepted; everything else
/// is reported as malformed so the caller can log and drop it.
pub fn parse_message(text: &str, received_at: f64) -> Result<TelemetrySample, MalformedTelemetry> {
    let message: Value = serde_json::from_str(text).map_err(MalformedTelemetry::NotJson)?;

    let kind = message.get("type").and_then(Value::as_str);
    if kind != Some(TELEMETRY_MESSAGE_TYPE) {
        return Err(MalformedTelemetry::UnexpectedType(kind.map(str::to_owned)));
    }

    let record = message
        .get("record")
        .filter(|record| !record.is_null())
        .ok_or(MalformedTelemetry::MissingRecord)?;
    let raw: RawRecord =
        serde_json::from_value(record.clone()).map_err(MalformedTelemetry::BadRecord)?;

    Ok(TelemetrySample {
        backend: raw.backend,
        latency_ms: raw.latency_ms,
        value: raw.value,
        fanout: raw.fanout,
        ts: raw.ts.unwrap_or(received_at),
        extras: raw.extras,
    })
}

/// Current wall-clock time in seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_server_record() {
        let text = r#"{"type": "telemetry", "record": {"backend": "gpu", "latency_ms": 3.2, "value": 0.1, "fanout": 7.0, "max_score": 4.0}}"#;
        let sample = parse_message(text, 1000.5).unwrap();
        assert_eq!(sample.backend, "gpu");
        assert_eq!(sample.latency_ms, 3.2);
        assert_eq!(sample.fanout, Some(7.0));
        // No ts in the record: arrival time is used
        assert_eq!(sample.ts, 1000.5);
        assert_eq!(sample.extras["max_score"], 4.0);
        assert!(!sample.extras.contains_key("fanout"));
    }

    #[test]
    fn test_keeps_server_timestamp() {
        let text = r#"{"type": "telemetry", "record": {"backend": "cpu", "latency_ms": 40.0, "value": -0.5, "ts": 1700000000.25}}"#;
        let sample = parse_message(text, 1.0).unwrap();
        assert_eq!(sample.ts, 1700000000.25);
        assert_eq!(sample.fanout, None);
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            parse_message("not json", 0.0),
            Err(MalformedTelemetry::NotJson(_))
        ));
    }

    #[test]
    fn test_rejects_other_message_types() {
        assert!(matches!(
            parse_message(r#"{"type": "hello"}"#, 0.0),
            Err(MalformedTelemetry::UnexpectedType(Some(t))) if t == "hello"
        ));
        assert!(matches!(
            parse_message("[1, 2, 3]", 0.0),
            Err(MalformedTelemetry::UnexpectedType(None))
        ));
    }

    #[test]
    fn test_rejects_missing_or_bad_record() {
        assert!(matches!(
            parse_message(r#"{"type": "telemetry"}"#, 0.0),
            Err(MalformedTelemetry::MissingRecord)
        ));
        assert!(matches!(
            parse_message(r#"{"type": "telemetry", "record": null}"#, 0.0),
            Err(MalformedTelemetry::MissingRecord)
        ));
        assert!(matches!(
            parse_message(r#"{"type": "telemetry", "record": {"backend": "cpu"}}"#, 0.0),
            Err(MalformedTelemetry::BadRecord(_))
        ));
    }

    #[test]
    fn test_unix_now_is_recent() {
        // 2020-01-01
        assert!(unix_now() > 1_577_836_800.0);
    }
}
