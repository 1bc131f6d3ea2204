//! Case types.
//!
//! A case is the bounded collaboration context between one woman and her
//! midwives. All clinical state lives in the event log; the case record
//! itself carries only identity and lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(Uuid);

impl CaseId {
    /// Creates a new random case ID.
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

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a case. Closed cases never reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Active,
    Closed,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A case record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Unique identifier.
    pub case_id: CaseId,
    /// Lifecycle status.
    pub status: CaseStatus,
    /// When the case was created.
    pub created_at: DateTime<Utc>,
    /// When the case was closed. None while active.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Case {
    /// Creates a new active case.
    #[must_use]
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            case_id: CaseId::new(),
            status: CaseStatus::Active,
            created_at,
            closed_at: None,
        }
    }

    /// Returns true if the case is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.status, CaseStatus::Closed)
    }

    /// Closes the case at the given instant. Idempotent: closing an
    /// already-closed case keeps the original close time.
    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.is_closed() {
            return;
        }
        self.status = CaseStatus::Closed;
        self.closed_at = Some(at);
    }
}
