//! Per-kind payload validation.
//!
//! Every candidate event is checked against the schema registered for
//! its `(kind, payload_v)` pair before it can be appended. Kinds outside
//! the known vocabulary (or known kinds with an unknown payload version)
//! are accepted only when the store is configured for forward-compatible
//! passthrough; the payload must be a JSON object in every mode.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::event::kinds;

/// Severity values accepted on `labor_event` payloads.
pub const LABOR_SEVERITIES: [&str; 3] = ["low", "moderate", "high"];

fn kind_regex() -> &'static Regex {
    static KIND_RE: OnceLock<Regex> = OnceLock::new();
    KIND_RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]*$").expect("kind regex is statically valid")
    })
}

/// Validates that a kind string is well-formed.
///
/// # Errors
///
/// Returns `EmptyKind` for empty/whitespace kinds and `MalformedKind`
/// for anything outside `[a-z][a-z0-9_]*`.
pub fn validate_kind(kind: &str) -> Result<(), ValidationError> {
    if kind.trim().is_empty() {
        return Err(ValidationError::EmptyKind);
    }
    if !kind_regex().is_match(kind) {
        return Err(ValidationError::MalformedKind {
            kind: kind.to_string(),
        });
    }
    Ok(())
}

/// Returns true if the kind is in the known vocabulary.
#[must_use]
pub fn is_known_kind(kind: &str) -> bool {
    matches!(
        kind,
        kinds::CONTRACTION_START
            | kinds::CONTRACTION_END
            | kinds::LABOR_EVENT
            | kinds::SET_LABOR_ACTIVE
            | kinds::POSTPARTUM_CHECKIN
            | kinds::SET_POSTPARTUM_ACTIVE
            | kinds::NOTE
            | kinds::VISIT_TASK
            | kinds::ALERT_TRIGGERED
            | kinds::ALERT_ACK
            | kinds::ALERT_RESOLVE
    )
}

/// Validates a payload against the schema for `(kind, payload_v)`.
///
/// # Errors
///
/// - `UnknownKind` / `UnknownPayloadVersion` when the pair is not
///   registered and `allow_unknown` is false.
/// - `InvalidPayload` when a registered schema rejects the payload.
pub fn validate_payload(
    kind: &str,
    payload_v: i32,
    payload: &Value,
    allow_unknown: bool,
) -> Result<(), ValidationError> {
    let object = require_object(kind, payload)?;

    if !is_known_kind(kind) {
        if allow_unknown {
            return Ok(());
        }
        return Err(ValidationError::UnknownKind {
            kind: kind.to_string(),
        });
    }

    if payload_v != 1 {
        if allow_unknown {
            return Ok(());
        }
        return Err(ValidationError::UnknownPayloadVersion {
            kind: kind.to_string(),
            version: payload_v,
        });
    }

    match kind {
        kinds::CONTRACTION_START => Ok(()),
        kinds::CONTRACTION_END => optional_non_negative(kind, object, "duration_s"),
        kinds::LABOR_EVENT => {
            require_non_empty_str(kind, object, "kind")?;
            optional_enum(kind, object, "severity", &LABOR_SEVERITIES)
        }
        kinds::SET_LABOR_ACTIVE | kinds::SET_POSTPARTUM_ACTIVE => {
            require_bool(kind, object, "active")
        }
        kinds::POSTPARTUM_CHECKIN => require_object_field(kind, object, "items"),
        kinds::NOTE => optional_str(kind, object, "text"),
        kinds::VISIT_TASK => {
            optional_str(kind, object, "title")?;
            optional_bool(kind, object, "done")
        }
        kinds::ALERT_TRIGGERED => {
            require_non_empty_str(kind, object, "code")?;
            require_non_empty_str(kind, object, "severity")?;
            require_non_empty_str(kind, object, "summary")
        }
        kinds::ALERT_ACK | kinds::ALERT_RESOLVE => require_uuid(kind, object, "alert_event_id"),
        _ => Ok(()),
    }
}

fn invalid(kind: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidPayload {
        kind: kind.to_string(),
        reason: reason.into(),
    }
}

fn require_object<'a>(
    kind: &str,
    payload: &'a Value,
) -> Result<&'a Map<String, Value>, ValidationError> {
    payload
        .as_object()
        .ok_or_else(|| invalid(kind, "payload must be a JSON object"))
}

fn require_non_empty_str(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(invalid(kind, format!("field '{field}' must be non-empty"))),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a string"))),
        None => Err(invalid(kind, format!("missing field '{field}'"))),
    }
}

fn require_bool(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a boolean"))),
        None => Err(invalid(kind, format!("missing field '{field}'"))),
    }
}

fn require_object_field(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be an object"))),
        None => Err(invalid(kind, format!("missing field '{field}'"))),
    }
}

fn require_uuid(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        Some(Value::String(s)) if s.parse::<uuid::Uuid>().is_ok() => Ok(()),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a UUID string"))),
        None => Err(invalid(kind, format!("missing field '{field}'"))),
    }
}

fn optional_str(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a string"))),
    }
}

fn optional_bool(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a boolean"))),
    }
}

fn optional_non_negative(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match object.get(field) {
        None => Ok(()),
        Some(Value::Number(n)) => {
            if n.as_f64().is_some_and(|v| v >= 0.0) {
                Ok(())
            } else {
                Err(invalid(kind, format!("field '{field}' must be >= 0")))
            }
        }
        Some(_) => Err(invalid(kind, format!("field '{field}' must be a number"))),
    }
}

fn optional_enum(
    kind: &str,
    object: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
) -> Result<(), ValidationError> {
    match object.get(field) {
        None => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(_) => Err(invalid(
            kind,
            format!("field '{field}' must be one of {allowed:?}"),
        )),
    }
}
