use chrono::Utc;
use log::info;
use serde_json::{Map, Value};

pub type Properties = Map<String, Value>;

/// One-way analytics sink. Implementations swallow their own failures; the
/// caller never learns whether an event was delivered.
pub trait Telemetry {
    fn track(&self, session_id: &str, event: &str, properties: Properties);
}

/// Writes each event as a single log line under the `askcsv::telemetry`
/// target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn track(&self, session_id: &str, event: &str, properties: Properties) {
        info!(
            target: "askcsv::telemetry",
            "event={:?} session={} at={} properties={}",
            event,
            session_id,
            Utc::now().to_rfc3339(),
            Value::Object(properties)
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn track(&self, _session_id: &str, _event: &str, _properties: Properties) {}
}
