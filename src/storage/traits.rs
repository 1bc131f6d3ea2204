//! Abstract storage traits.
//!
//! These traits define the contract storage backends must implement.
//! The crate ships a thread-safe in-memory backend for embedded use and
//! tests; a durable backend slots in behind the same traits without
//! touching the engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::case::{Case, CaseId, CaseStatus};
use crate::event::{Event, EventId, EventSource};
use crate::track::Track;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Case not found.
    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// A fully validated event ready for insertion; everything but the
/// sequence number, which only the store may assign.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Client-generated identifier (idempotency key).
    pub event_id: EventId,
    /// Owning case.
    pub case_id: CaseId,
    /// Occurrence kind.
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

/// Result of an idempotent append.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    /// The stored event: the new row, or the existing one when the
    /// identifier was already present.
    pub event: Event,
    /// False when the identifier already existed (idempotent re-send).
    pub newly_inserted: bool,
}

/// Storage trait for case records.
pub trait CaseStore: Send + Sync {
    /// Insert a new case. Returns error if the ID already exists.
    fn insert(&self, case: Case) -> Result<(), StorageError>;

    /// Get a case by ID.
    fn get(&self, id: CaseId) -> Result<Option<Case>, StorageError>;

    /// Replace an existing case record. Returns error if not found.
    fn update(&self, case: Case) -> Result<(), StorageError>;

    /// List cases with the given status, ordered by creation time then
    /// ID, skipping `offset` and returning at most `limit`.
    fn list_by_status(
        &self,
        status: CaseStatus,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Case>, StorageError>;
}

/// Storage trait for the append-only event ledger.
///
/// # Atomicity
/// `append` must make the uniqueness check, the sequence assignment, and
/// the row insertion one atomic step: an event is never visible without
/// a sequence number, and concurrent duplicate submissions of the same
/// identifier must converge on a single row and a single number.
pub trait EventStore: Send + Sync {
    /// Idempotent insert. If `record.event_id` already exists the call
    /// succeeds, returning the existing row with `newly_inserted ==
    /// false`; otherwise the next sequence number is assigned and the
    /// row persisted.
    fn append(&self, record: NewEvent) -> Result<Appended, StorageError>;

    /// Get an event by ID.
    fn get(&self, id: EventId) -> Result<Option<Event>, StorageError>;

    /// Events of a case with sequence number strictly greater than
    /// `after_seq`, ascending, at most `limit`.
    fn list_after(
        &self,
        case_id: CaseId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<Event>, StorageError>;

    /// All events of a case with the given kind, ascending by sequence.
    fn find_by_kind(&self, case_id: CaseId, kind: &str) -> Result<Vec<Event>, StorageError>;

    /// The highest-sequence event of a case with the given kind.
    fn latest_by_kind(&self, case_id: CaseId, kind: &str)
        -> Result<Option<Event>, StorageError>;

    /// All events of a case on the given track, ascending by sequence.
    fn find_by_track(&self, case_id: CaseId, track: Track) -> Result<Vec<Event>, StorageError>;

    /// Originator timestamp of the most recently ingested event, if any.
    fn last_event_ts(&self, case_id: CaseId) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Highest sequence number assigned to the case, 0 if none.
    fn max_seq(&self, case_id: CaseId) -> Result<u64, StorageError>;
}
