//! Event normalization and validation.
//!
//! # Responsibilities
//! - Turn arbitrary caller-supplied event mappings into `custom_event`
//!   records
//! - Validate contact form submissions and turn them into
//!   `form_submission` records
//! - Own the envelope keys: caller values for `kind`, `occurred_at` and
//!   `logged_at` are always discarded
//!
//! # Design Decisions
//! - Normalization is infallible for event mappings (any JSON object is
//!   acceptable) and fallible only for forms, where every failed field is
//!   reported rather than just the first

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::telemetry::record::Record;

/// Envelope keys reserved for the normalizer; caller-supplied values for
/// these are dropped before the record is built.
const RESERVED_KEYS: [&str; 3] = ["kind", "occurred_at", "logged_at"];

/// A single invalid or missing form field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field absent or blank.
    #[error("field `{0}` is required")]
    Missing(&'static str),
    /// Field present but unusable.
    #[error("field `{field}` is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) => field,
            ValidationError::Invalid { field, .. } => field,
        }
    }
}

/// Raw contact form payload as received from the client.
///
/// All fields are optional at the transport layer so that missing inputs
/// surface as validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

/// Normalize an arbitrary event mapping into a `custom_event` record.
///
/// Caller-supplied envelope keys are removed first, so a submitted `kind`
/// can never masquerade as another record kind. All remaining fields pass
/// through untouched, in their original order.
pub fn normalize_event(mut body: Map<String, Value>) -> Record {
    for key in RESERVED_KEYS {
        // shift_remove keeps the remaining entries in insertion order;
        // plain remove is a swap_remove under preserve_order.
        if body.shift_remove(key).is_some() {
            tracing::debug!(key, "Discarded reserved key from submitted event");
        }
    }
    Record::custom_event(body)
}

/// Validate a contact submission and normalize it into a `form_submission`
/// record.
///
/// Values are trimmed before storage. Every failing field is reported, so a
/// client can fix the whole form in one pass.
pub fn normalize_form(submission: ContactSubmission) -> Result<Record, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = required_text("name", submission.name.as_deref(), &mut errors);
    let email = required_text("email", submission.email.as_deref(), &mut errors);
    let message = required_text("message", submission.message.as_deref(), &mut errors);

    if let Some(email) = email {
        if !is_plausible_email(email) {
            errors.push(ValidationError::Invalid {
                field: "email",
                reason: "not a plausible email address",
            });
        }
    }

    match (name, email, message) {
        (Some(name), Some(email), Some(message)) if errors.is_empty() => {
            Ok(Record::form_submission(name, email, message))
        }
        _ => Err(errors),
    }
}

/// Trimmed field value, or `None` (plus a recorded error) when absent or
/// blank.
fn required_text<'a>(
    field: &'static str,
    value: Option<&'a str>,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a str> {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Some(trimmed),
        _ => {
            errors.push(ValidationError::Missing(field));
            None
        }
    }
}

/// Shallow shape check: one `@`, non-empty local part, dotted domain, no
/// whitespace. Deliverability is out of scope for a contact form.
fn is_plausible_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::record::RecordKind;

    fn submission(name: &str, email: &str, message: &str) -> ContactSubmission {
        ContactSubmission {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            message: Some(message.to_string()),
        }
    }

    #[test]
    fn test_event_passes_fields_through_in_order() {
        let body: Map<String, Value> =
            serde_json::from_str(r#"{"zeta": 1, "alpha": {"n": 2}}"#).unwrap();
        let record = normalize_event(body);
        assert_eq!(record.kind(), RecordKind::CustomEvent);
        let keys: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_event_reserved_keys_are_discarded() {
        let body: Map<String, Value> = serde_json::from_str(
            r#"{"kind": "request", "occurred_at": "1999-01-01T00:00:00Z", "logged_at": "x", "foo": 1}"#,
        )
        .unwrap();
        let record = normalize_event(body);
        assert_eq!(record.kind(), RecordKind::CustomEvent);
        assert_eq!(record.field("foo"), Some(&Value::from(1)));
        assert!(record.field("kind").is_none());
        assert!(record.field("occurred_at").is_none());
        assert!(record.field("logged_at").is_none());
        // occurred_at is normalizer-assigned, not the caller's 1999 value.
        assert!(record.occurred_at().timestamp() > 946_684_800);
    }

    #[test]
    fn test_stripping_reserved_keys_keeps_field_order() {
        let body: Map<String, Value> =
            serde_json::from_str(r#"{"kind": "x", "a": 1, "b": 2, "c": 3}"#).unwrap();
        let record = normalize_event(body);
        let keys: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_event_accepts_empty_object() {
        let record = normalize_event(Map::new());
        assert_eq!(record.kind(), RecordKind::CustomEvent);
        assert!(record.fields().is_empty());
    }

    #[test]
    fn test_form_valid_submission() {
        let record = normalize_form(submission(" Jane ", "jane@example.com", "hello")).unwrap();
        assert_eq!(record.kind(), RecordKind::FormSubmission);
        assert_eq!(record.field("name"), Some(&Value::from("Jane")));
        assert_eq!(record.field("email"), Some(&Value::from("jane@example.com")));
        assert_eq!(record.field("message"), Some(&Value::from("hello")));
    }

    #[test]
    fn test_form_missing_and_blank_fields() {
        let errors = normalize_form(ContactSubmission {
            name: None,
            email: Some("jane@example.com".to_string()),
            message: Some("   ".to_string()),
        })
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, vec!["name", "message"]);
    }

    #[test]
    fn test_form_collects_all_errors() {
        let errors = normalize_form(ContactSubmission::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_form_rejects_implausible_email() {
        let errors = normalize_form(submission("Jane", "not-an-email", "hi")).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Invalid {
                field: "email",
                reason: "not a plausible email address",
            }]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_plausible_email("a@b.com"));
        assert!(is_plausible_email("first.last@sub.example.org"));
        assert!(!is_plausible_email("@b.com"));
        assert!(!is_plausible_email("a@"));
        assert!(!is_plausible_email("a@nodot"));
        assert!(!is_plausible_email("a b@c.com"));
        assert!(!is_plausible_email("a@.com"));
    }
}
