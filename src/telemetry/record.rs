//! Telemetry record model.
//!
//! # Responsibilities
//! - Define the atomic unit of persisted telemetry (`Record`)
//! - Build the four record kinds with their required fields
//! - Serialize one record to one self-contained JSON object
//!
//! # Design Decisions
//! - The open field map is flattened into the top-level JSON object, so a
//!   persisted line reads as one flat metric object
//! - Field insertion order is preserved end to end (serde_json
//!   `preserve_order`)
//! - `logged_at` is writer-assigned and clamped to never precede
//!   `occurred_at`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind discriminant for persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Request,
    Exception,
    CustomEvent,
    FormSubmission,
}

impl RecordKind {
    /// Stable name as it appears in log lines and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Request => "request",
            RecordKind::Exception => "exception",
            RecordKind::CustomEvent => "custom_event",
            RecordKind::FormSubmission => "form_submission",
        }
    }
}

/// One normalized unit of telemetry.
///
/// A record is immutable once constructed. The append log writer assigns
/// `logged_at` immediately before the write; nothing else is ever mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: RecordKind,
    occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logged_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    fn new(kind: RecordKind, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            occurred_at: Utc::now(),
            logged_at: None,
            fields,
        }
    }

    /// Build a `request` record from a completed round trip.
    ///
    /// `duration_ms` is clamped to zero and rounded to two decimals, matching
    /// the wire shape consumers already parse.
    pub fn request(
        path: &str,
        method: &str,
        status_code: u16,
        duration_ms: f64,
        client_ip: &str,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("path".to_string(), Value::from(path));
        fields.insert("method".to_string(), Value::from(method));
        fields.insert("status_code".to_string(), Value::from(status_code));
        fields.insert(
            "duration_ms".to_string(),
            Value::from(round_duration(duration_ms.max(0.0))),
        );
        fields.insert("client_ip".to_string(), Value::from(client_ip));
        Self::new(RecordKind::Request, fields)
    }

    /// Build an `exception` record for a failed or aborted round trip.
    pub fn exception(path: &str, client_ip: &str, error: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("path".to_string(), Value::from(path));
        fields.insert("client_ip".to_string(), Value::from(client_ip));
        fields.insert("error".to_string(), Value::from(error));
        Self::new(RecordKind::Exception, fields)
    }

    /// Build a `custom_event` record from an already-normalized field map.
    pub fn custom_event(fields: Map<String, Value>) -> Self {
        Self::new(RecordKind::CustomEvent, fields)
    }

    /// Build a `form_submission` record.
    pub fn form_submission(name: &str, email: &str, message: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("email".to_string(), Value::from(email));
        fields.insert("message".to_string(), Value::from(message));
        Self::new(RecordKind::FormSubmission, fields)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Persistence timestamp; `None` until the record has been appended.
    pub fn logged_at(&self) -> Option<DateTime<Utc>> {
        self.logged_at
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a single open field by key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Assign the persistence timestamp, clamped so `logged_at` never
    /// precedes `occurred_at` even if the wall clock stepped backwards.
    pub(crate) fn set_logged_at(&mut self, at: DateTime<Utc>) {
        self.logged_at = Some(at.max(self.occurred_at));
    }
}

/// Two-decimal rounding, the precision the log line carries.
fn round_duration(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RecordKind::CustomEvent).unwrap(),
            "\"custom_event\""
        );
        assert_eq!(
            serde_json::to_string(&RecordKind::FormSubmission).unwrap(),
            "\"form_submission\""
        );
        assert_eq!(RecordKind::Request.as_str(), "request");
    }

    #[test]
    fn test_request_record_fields() {
        let record = Record::request("/health", "GET", 200, 12.3456, "127.0.0.1");
        assert_eq!(record.kind(), RecordKind::Request);
        assert_eq!(record.field("path"), Some(&Value::from("/health")));
        assert_eq!(record.field("method"), Some(&Value::from("GET")));
        assert_eq!(record.field("status_code"), Some(&Value::from(200)));
        assert_eq!(record.field("duration_ms"), Some(&Value::from(12.35)));
        assert_eq!(record.field("client_ip"), Some(&Value::from("127.0.0.1")));
        assert!(record.logged_at().is_none());
    }

    #[test]
    fn test_negative_duration_clamped() {
        let record = Record::request("/x", "GET", 200, -5.0, "unknown");
        assert_eq!(record.field("duration_ms"), Some(&Value::from(0.0)));
    }

    #[test]
    fn test_serialized_line_is_flat() {
        let record = Record::request("/a", "POST", 201, 1.0, "10.0.0.1");
        let line = serde_json::to_string(&record).unwrap();
        // kind and occurred_at lead, the open fields follow flattened.
        assert!(line.starts_with("{\"kind\":\"request\",\"occurred_at\":"));
        assert!(line.contains("\"path\":\"/a\""));
        assert!(line.contains("\"status_code\":201"));
        // logged_at is absent until the writer assigns it.
        assert!(!line.contains("logged_at"));
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let mut fields = Map::new();
        fields.insert("foo".to_string(), Value::from(1));
        fields.insert("nested".to_string(), serde_json::json!({"a": [1, 2]}));
        let record = Record::custom_event(fields);

        let line = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.field("foo"), Some(&Value::from(1)));
    }

    #[test]
    fn test_logged_at_never_precedes_occurred_at() {
        let mut record = Record::exception("/x", "unknown", "boom");
        let before = record.occurred_at() - Duration::seconds(10);
        record.set_logged_at(before);
        assert_eq!(record.logged_at(), Some(record.occurred_at()));

        let after = record.occurred_at() + Duration::seconds(1);
        record.set_logged_at(after);
        assert_eq!(record.logged_at(), Some(after));
    }
}
