//! Error types for partus.
//!
//! All errors are strongly typed using thiserror. Per-event failures on
//! the sync path are additionally mapped to stable machine-readable
//! reason codes so offline clients can reconcile their local queues.

use thiserror::Error;
use uuid::Uuid;

use crate::case::CaseId;
use crate::event::EventId;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Event kind cannot be empty")]
    EmptyKind,

    #[error("Event kind '{kind}' is malformed")]
    MalformedKind { kind: String },

    #[error("Event kind '{kind}' is not in the known vocabulary")]
    UnknownKind { kind: String },

    #[error("Event kind '{kind}' is reserved for system-authored events")]
    ReservedKind { kind: String },

    #[error("Unknown payload version {version} for kind '{kind}'")]
    UnknownPayloadVersion { kind: String, version: i32 },

    #[error("Invalid payload for kind '{kind}': {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Invalid cursor '{cursor}'")]
    InvalidCursor { cursor: String },

    #[error("Limit {limit} is out of range [{min}, {max}]")]
    LimitOutOfRange { limit: usize, min: usize, max: usize },

    #[error("Event {event_id} is not an alert trigger")]
    NotAnAlert { event_id: Uuid },
}

/// Execution errors that occur while applying operations.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Case not found: {id}")]
    CaseNotFound { id: CaseId },

    #[error("Event not found: {id}")]
    EventNotFound { id: EventId },

    #[error("Case {id} is closed; kind '{kind}' is not closure-exempt")]
    CaseClosed { id: CaseId, kind: String },

    #[error("Event case {submitted} does not match authorized case {scope}")]
    ScopeViolation { scope: CaseId, submitted: CaseId },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

/// Top-level error type for partus.
#[derive(Debug, Error)]
pub enum PartusError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PartusError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// Validation and scope failures are deterministic; only storage and
    /// internal failures are worth a wholesale retry (safe under the
    /// idempotent append contract).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(e, ExecutionError::Storage { .. }),
            Self::Internal { .. } => true,
        }
    }

    /// Stable machine-readable reason code for per-event rejections.
    ///
    /// These strings are part of the sync wire contract; clients match on
    /// them to decide whether to drop or repair a queued event.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => match e {
                ValidationError::EmptyKind | ValidationError::MalformedKind { .. } => {
                    "invalid_type"
                }
                ValidationError::UnknownKind { .. } => "unknown_type",
                ValidationError::ReservedKind { .. } => "reserved_type",
                ValidationError::UnknownPayloadVersion { .. } => "unknown_payload_version",
                ValidationError::InvalidPayload { .. } => "payload_invalid",
                ValidationError::InvalidCursor { .. } => "invalid_cursor",
                ValidationError::LimitOutOfRange { .. } => "invalid_limit",
                ValidationError::NotAnAlert { .. } => "not_an_alert",
            },
            Self::Execution(e) => match e {
                ExecutionError::CaseNotFound { .. } => "case_not_found",
                ExecutionError::EventNotFound { .. } => "event_not_found",
                ExecutionError::CaseClosed { .. } => "case_closed",
                ExecutionError::ScopeViolation { .. } => "case_scope_violation",
                ExecutionError::Storage { .. } => "storage_error",
            },
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Result type alias for partus operations.
pub type PartusResult<T> = Result<T, PartusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_the_kind() {
        let err = ValidationError::UnknownKind {
            kind: "galaxy_spin".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("galaxy_spin"));
        assert!(msg.contains("not in the known vocabulary"));
    }

    #[test]
    fn scope_violation_reason_code() {
        let err: PartusError = ExecutionError::ScopeViolation {
            scope: CaseId::new(),
            submitted: CaseId::new(),
        }
        .into();
        assert_eq!(err.reason_code(), "case_scope_violation");
        assert!(err.is_execution());
        assert!(!err.is_retryable());
    }

    #[test]
    fn payload_error_reason_code() {
        let err: PartusError = ValidationError::InvalidPayload {
            kind: "set_labor_active".to_string(),
            reason: "missing field 'active'".to_string(),
        }
        .into();
        assert_eq!(err.reason_code(), "payload_invalid");
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn storage_errors_are_retryable() {
        let err: PartusError = ExecutionError::Storage {
            message: "backend unavailable".to_string(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.reason_code(), "storage_error");
    }

    #[test]
    fn case_closed_display_mentions_kind() {
        let err = ExecutionError::CaseClosed {
            id: CaseId::new(),
            kind: "contraction_start".to_string(),
        };
        assert!(format!("{err}").contains("contraction_start"));
    }
}
