//! In-memory storage backend.
//!
//! Thread-safe reference implementations of the storage traits, intended
//! for embedded usage and tests. Sequence numbers are assigned under the
//! write lock, so the idempotency check, the number, and the insertion
//! commit together.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::case::{Case, CaseId, CaseStatus};
use crate::event::{Event, EventId};
use crate::storage::traits::{
    Appended, CaseStore, EventStore, NewEvent, StorageError,
};
use crate::track::Track;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory case store.
#[derive(Debug, Default)]
pub struct InMemoryCaseStore {
    inner: RwLock<HashMap<CaseId, Case>>,
}

impl InMemoryCaseStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaseStore for InMemoryCaseStore {
    fn insert(&self, case: Case) -> Result<(), StorageError> {
        let mut state = self.inner.write().map_err(|_| lock_err("case insert"))?;
        if state.contains_key(&case.case_id) {
            return Err(StorageError::DuplicateKey(case.case_id.to_string()));
        }
        state.insert(case.case_id, case);
        Ok(())
    }

    fn get(&self, id: CaseId) -> Result<Option<Case>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("case get"))?;
        Ok(state.get(&id).cloned())
    }

    fn update(&self, case: Case) -> Result<(), StorageError> {
        let mut state = self.inner.write().map_err(|_| lock_err("case update"))?;
        if !state.contains_key(&case.case_id) {
            return Err(StorageError::CaseNotFound(case.case_id));
        }
        state.insert(case.case_id, case);
        Ok(())
    }

    fn list_by_status(
        &self,
        status: CaseStatus,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Case>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("case list"))?;
        let mut cases: Vec<Case> = state
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        cases.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.case_id.as_uuid().cmp(&b.case_id.as_uuid()))
        });
        Ok(cases.into_iter().skip(offset).take(limit).collect())
    }
}

#[derive(Debug, Default)]
struct EventState {
    next_seq: u64,
    by_id: HashMap<EventId, Event>,
    /// Per-case event ids in ascending sequence order.
    by_case: HashMap<CaseId, Vec<EventId>>,
}

impl EventState {
    fn case_events<'a>(&'a self, case_id: CaseId) -> impl Iterator<Item = &'a Event> + 'a {
        self.by_case
            .get(&case_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.by_id.get(id))
    }
}

/// Thread-safe in-memory event ledger.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<EventState>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, record: NewEvent) -> Result<Appended, StorageError> {
        let mut state = self.inner.write().map_err(|_| lock_err("event append"))?;

        // Insert-ignore-conflict: a duplicate identifier returns the
        // existing row and never mints a second sequence number.
        if let Some(existing) = state.by_id.get(&record.event_id) {
            return Ok(Appended {
                event: existing.clone(),
                newly_inserted: false,
            });
        }

        state.next_seq += 1;
        let event = Event {
            event_id: record.event_id,
            case_id: record.case_id,
            seq: state.next_seq,
            kind: record.kind,
            ts: record.ts,
            server_ts: record.server_ts,
            track: record.track,
            source: record.source,
            payload_v: record.payload_v,
            payload: record.payload,
        };

        state.by_id.insert(event.event_id, event.clone());
        state
            .by_case
            .entry(event.case_id)
            .or_default()
            .push(event.event_id);

        Ok(Appended {
            event,
            newly_inserted: true,
        })
    }

    fn get(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn list_after(
        &self,
        case_id: CaseId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<Event>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event list"))?;
        Ok(state
            .case_events(case_id)
            .filter(|e| e.seq > after_seq)
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_by_kind(&self, case_id: CaseId, kind: &str) -> Result<Vec<Event>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event find"))?;
        Ok(state
            .case_events(case_id)
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    fn latest_by_kind(
        &self,
        case_id: CaseId,
        kind: &str,
    ) -> Result<Option<Event>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event latest"))?;
        Ok(state
            .case_events(case_id)
            .filter(|e| e.kind == kind)
            .last()
            .cloned())
    }

    fn find_by_track(&self, case_id: CaseId, track: Track) -> Result<Vec<Event>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event find"))?;
        Ok(state
            .case_events(case_id)
            .filter(|e| e.track == track)
            .cloned()
            .collect())
    }

    fn last_event_ts(&self, case_id: CaseId) -> Result<Option<DateTime<Utc>>, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event last ts"))?;
        Ok(state.case_events(case_id).map(|e| e.ts).max())
    }

    fn max_seq(&self, case_id: CaseId) -> Result<u64, StorageError> {
        let state = self.inner.read().map_err(|_| lock_err("event max seq"))?;
        Ok(state
            .case_events(case_id)
            .map(|e| e.seq)
            .last()
            .unwrap_or(0))
    }
}
