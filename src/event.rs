//! Event types and wire envelopes.
//!
//! An event is an immutable, timestamped fact attached to a case. Events
//! are identified by a client-generated UUID (the idempotency key) and
//! ordered by a server-assigned sequence number that is minted exactly
//! once, at first successful insertion.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::case::CaseId;
use crate::track::Track;

/// Well-known event kinds.
///
/// The vocabulary is open (the store can be configured to pass unknown
/// kinds through), but these are the kinds the engine understands.
pub mod kinds {
    /// A contraction began. Labor track, feeds the milestone rules.
    pub const CONTRACTION_START: &str = "contraction_start";
    /// A contraction ended.
    pub const CONTRACTION_END: &str = "contraction_end";
    /// A free-form labor observation, e.g. `{kind: "bleeding", severity: "high"}`.
    pub const LABOR_EVENT: &str = "labor_event";
    /// Toggle for the labor-active flag.
    pub const SET_LABOR_ACTIVE: &str = "set_labor_active";
    /// A structured postpartum self-check.
    pub const POSTPARTUM_CHECKIN: &str = "postpartum_checkin";
    /// Toggle for the postpartum-active flag.
    pub const SET_POSTPARTUM_ACTIVE: &str = "set_postpartum_active";
    /// Free-form note.
    pub const NOTE: &str = "note";
    /// A task for the next midwife visit.
    pub const VISIT_TASK: &str = "visit_task";
    /// System-authored alert trigger.
    pub const ALERT_TRIGGERED: &str = "alert_triggered";
    /// Acknowledgement of an alert trigger. Never deactivates the alert.
    pub const ALERT_ACK: &str = "alert_ack";
    /// Resolution of an alert trigger. Deactivates the alert.
    pub const ALERT_RESOLVE: &str = "alert_resolve";
}

/// Unique identifier for an event. Client-generated; doubles as the
/// idempotency key for the append path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who originated an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// The reporting participant's device.
    Woman,
    /// A supervising midwife's device.
    Midwife,
    /// The engine itself (alerts, automatic toggles).
    System,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Woman => write!(f, "woman"),
            Self::Midwife => write!(f, "midwife"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A stored event.
///
/// `seq` is assigned by the store at first insertion and never reused or
/// reassigned; `server_ts` and `track` are server-authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Client-generated identifier; unique across the whole store.
    pub event_id: EventId,
    /// Owning case.
    pub case_id: CaseId,
    /// Globally increasing, case-filterable sequence number.
    pub seq: u64,
    /// Occurrence kind, e.g. `contraction_start`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Originator-supplied timestamp.
    pub ts: DateTime<Utc>,
    /// Server ingest timestamp.
    pub server_ts: DateTime<Utc>,
    /// Server-derived track.
    pub track: Track,
    /// Source role.
    pub source: EventSource,
    /// Payload schema version.
    pub payload_v: i32,
    /// Opaque structured payload; shape depends on `kind`.
    pub payload: serde_json::Value,
}

impl Event {
    /// Returns the wire envelope for this event.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        Envelope {
            event_id: self.event_id,
            case_id: self.case_id,
            kind: self.kind.clone(),
            ts: self.ts,
            server_ts: self.server_ts,
            track: self.track,
            source: self.source,
            payload_v: self.payload_v,
            payload: self.payload.clone(),
        }
    }
}

/// A candidate event submitted by a client.
///
/// `track` and `source` are accepted on the wire for forward
/// compatibility but ignored: the server re-derives both. `case_id` is
/// optional; when present it must match the caller's scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Client-generated identifier.
    pub event_id: EventId,
    /// Owning case; defaults to the scope's case when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<CaseId>,
    /// Occurrence kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Originator-supplied timestamp.
    pub ts: DateTime<Utc>,
    /// Ignored on input; the server classifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<Track>,
    /// Ignored on input; the server assigns from the caller's scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    /// Payload schema version; defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_v: Option<i32>,
    /// Structured payload.
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
}

fn default_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl EventDraft {
    /// Creates a draft with an empty object payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            case_id: None,
            kind: kind.into(),
            ts,
            track: None,
            source: None,
            payload_v: None,
            payload: default_payload(),
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the case explicitly.
    #[must_use]
    pub fn with_case(mut self, case_id: CaseId) -> Self {
        self.case_id = Some(case_id);
        self
    }

    /// Effective payload version (defaults to 1).
    #[must_use]
    pub fn payload_version(&self) -> i32 {
        self.payload_v.unwrap_or(1)
    }
}

/// The event envelope exchanged verbatim in responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Client-generated identifier.
    pub event_id: EventId,
    /// Owning case.
    pub case_id: CaseId,
    /// Occurrence kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Originator-supplied timestamp.
    pub ts: DateTime<Utc>,
    /// Server ingest timestamp.
    pub server_ts: DateTime<Utc>,
    /// Server-derived track.
    pub track: Track,
    /// Source role.
    pub source: EventSource,
    /// Payload schema version.
    pub payload_v: i32,
    /// Structured payload.
    pub payload: serde_json::Value,
}
