//! Sync coordination.
//!
//! [`SyncEngine`] is the single write path into a case's event log. It
//! applies idempotent per-event appends, classifies on the way in, runs
//! the milestone pass inside the same per-case critical section, and
//! assembles the response so that `new_events` already reflects any
//! alerts the just-appended events triggered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alerts::{AlertPayload, MilestoneEngine};
use crate::case::{Case, CaseId, CaseStatus};
use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::error::{ExecutionError, PartusError, PartusResult, ValidationError};
use crate::event::{kinds, Envelope, Event, EventDraft, EventId, EventSource};
use crate::schema;
use crate::state;
use crate::storage::{Appended, CaseStore, EventStore, NewEvent, StorageError};
use crate::track::Track;
use crate::watch::{WatchHub, WatchStream};

/// The caller's authorization: exactly one case, plus the source role
/// stamped onto everything the caller writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncScope {
    /// The only case this caller may read or write.
    pub case_id: CaseId,
    /// Role recorded on accepted events.
    pub source: EventSource,
}

impl SyncScope {
    /// Scope for the reporting participant's device.
    #[must_use]
    pub const fn woman(case_id: CaseId) -> Self {
        Self {
            case_id,
            source: EventSource::Woman,
        }
    }

    /// Scope for a supervising midwife's device.
    #[must_use]
    pub const fn midwife(case_id: CaseId) -> Self {
        Self {
            case_id,
            source: EventSource::Midwife,
        }
    }
}

/// A sync call's input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Informational only; never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_time: Option<DateTime<Utc>>,
    /// Last cursor the caller persisted; `None` means from the start.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Candidate events, oldest first.
    #[serde(default)]
    pub events: Vec<EventDraft>,
}

/// A per-event rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejected {
    /// The rejected event's identifier.
    pub event_id: EventId,
    /// Machine-readable reason code.
    pub reason: String,
}

/// A sync call's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Identifiers accepted this call, idempotent re-sends included.
    pub accepted_event_ids: Vec<EventId>,
    /// Per-event rejections; the batch itself never fails on these.
    pub rejected: Vec<Rejected>,
    /// Cursor to persist for the next call.
    pub server_cursor: String,
    /// Events the caller has not seen, ascending by sequence, including
    /// alerts emitted by this same call.
    pub new_events: Vec<Envelope>,
}

/// A read-only feed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    /// Cursor reflecting this page.
    pub server_cursor: String,
    /// Cursor for the next page, when this page was non-empty.
    pub next_cursor: Option<String>,
    /// Events, ascending by sequence.
    pub events: Vec<Envelope>,
}

/// A case with its derived state, as listed for supervising callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    /// Case identifier.
    pub case_id: CaseId,
    /// Lifecycle status.
    pub status: CaseStatus,
    /// Derived labor flag.
    pub labor_active: bool,
    /// Derived postpartum flag.
    pub postpartum_active: bool,
    /// Originator timestamp of the latest event, if any.
    pub last_event_ts: Option<DateTime<Utc>>,
    /// Count of currently active alerts.
    pub active_alerts: usize,
}

/// A page of case summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasePage {
    /// Summaries in creation order.
    pub cases: Vec<CaseSummary>,
    /// Echo of the offset this page started at.
    pub server_cursor: String,
    /// Offset cursor for the next page, when this page was full.
    pub next_cursor: Option<String>,
}

fn storage_err(err: StorageError) -> PartusError {
    PartusError::Execution(ExecutionError::Storage {
        message: err.to_string(),
    })
}

/// The event synchronization and derivation engine.
pub struct SyncEngine {
    cfg: EngineConfig,
    cases: Arc<dyn CaseStore>,
    events: Arc<dyn EventStore>,
    milestones: MilestoneEngine,
    watch: WatchHub,
    case_locks: Mutex<HashMap<CaseId, Arc<Mutex<()>>>>,
}

impl SyncEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(cfg: EngineConfig, cases: Arc<dyn CaseStore>, events: Arc<dyn EventStore>) -> Self {
        let milestones = MilestoneEngine::new(cfg.rules.clone());
        let watch = WatchHub::new(cfg.watch_capacity);
        Self {
            cfg,
            cases,
            events,
            milestones,
            watch,
            case_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    fn case_lock(&self, case_id: CaseId) -> PartusResult<Arc<Mutex<()>>> {
        let mut locks = self
            .case_locks
            .lock()
            .map_err(|_| PartusError::internal("case lock registry poisoned"))?;
        Ok(Arc::clone(locks.entry(case_id).or_default()))
    }

    fn require_case(&self, case_id: CaseId) -> PartusResult<Case> {
        self.cases
            .get(case_id)
            .map_err(storage_err)?
            .ok_or(PartusError::Execution(ExecutionError::CaseNotFound {
                id: case_id,
            }))
    }

    /// Creates a new active case. When `activate_labor` is set a system
    /// toggle event is appended immediately, so the case lists as in
    /// labor from the first sync.
    pub fn create_case(&self, activate_labor: bool) -> PartusResult<Case> {
        let case = Case::new(Utc::now());
        self.cases.insert(case.clone()).map_err(storage_err)?;
        info!(case = %case.case_id, "case created");

        if activate_labor {
            let lock = self.case_lock(case.case_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| PartusError::internal("case lock poisoned"))?;
            let draft = EventDraft::new(kinds::SET_LABOR_ACTIVE, Utc::now()).with_payload(
                serde_json::json!({"active": true, "auto_set_on_create": true}),
            );
            let appended = self.append_checked(&case, &draft, EventSource::System)?;
            self.publish_and_derive(&case, &appended)?;
        }
        Ok(case)
    }

    /// Fetches a case by ID.
    pub fn get_case(&self, case_id: CaseId) -> PartusResult<Case> {
        self.require_case(case_id)
    }

    /// Closes a case. Idempotent; a closed case never reopens.
    pub fn close_case(&self, case_id: CaseId) -> PartusResult<Case> {
        let lock = self.case_lock(case_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| PartusError::internal("case lock poisoned"))?;

        let mut case = self.require_case(case_id)?;
        if !case.is_closed() {
            case.close(Utc::now());
            self.cases.update(case.clone()).map_err(storage_err)?;
            info!(case = %case_id, "case closed");
        }
        Ok(case)
    }

    /// Applies a batch of candidate events and returns everything the
    /// caller has not yet seen.
    ///
    /// Per-event failures land in `rejected` and never abort the batch.
    /// Events already appended stay committed even if the call errors
    /// later; resending the same batch is safe under idempotency.
    pub fn sync(&self, scope: &SyncScope, request: &SyncRequest) -> PartusResult<SyncResponse> {
        let cursor = Cursor::decode(request.cursor.as_deref())?;

        let lock = self.case_lock(scope.case_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| PartusError::internal("case lock poisoned"))?;

        // Fetched under the lock so a concurrent close is observed.
        let case = self.require_case(scope.case_id)?;

        let mut accepted: Vec<EventId> = Vec::new();
        let mut rejected: Vec<Rejected> = Vec::new();

        for draft in &request.events {
            match self.apply_draft(&case, scope, draft) {
                Ok(appended) => {
                    accepted.push(appended.event.event_id);
                    self.publish_and_derive(&case, &appended)?;
                }
                Err(err) => {
                    debug!(
                        case = %scope.case_id,
                        event = %draft.event_id,
                        reason = err.reason_code(),
                        "event rejected"
                    );
                    rejected.push(Rejected {
                        event_id: draft.event_id,
                        reason: err.reason_code().to_string(),
                    });
                }
            }
        }

        let new_events = self
            .events
            .list_after(scope.case_id, cursor.seq(), self.cfg.sync_page_limit)
            .map_err(storage_err)?;
        let server_cursor = new_events
            .last()
            .map_or(cursor, |e| cursor.max(Cursor::at(e.seq)));

        info!(
            case = %scope.case_id,
            accepted = accepted.len(),
            rejected = rejected.len(),
            returned = new_events.len(),
            "sync applied"
        );

        Ok(SyncResponse {
            accepted_event_ids: accepted,
            rejected,
            server_cursor: server_cursor.encode(),
            new_events: new_events.iter().map(Event::envelope).collect(),
        })
    }

    /// Read-only event feed for a case.
    pub fn feed(
        &self,
        case_id: CaseId,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> PartusResult<FeedPage> {
        let limit = self.checked_limit(limit)?;
        let since = Cursor::decode(cursor)?;
        self.require_case(case_id)?;

        let rows = self
            .events
            .list_after(case_id, since.seq(), limit)
            .map_err(storage_err)?;
        let page_end = rows.last().map(|e| Cursor::at(e.seq));

        Ok(FeedPage {
            server_cursor: page_end.map_or(since, |c| since.max(c)).encode(),
            next_cursor: page_end.map(Cursor::encode),
            events: rows.iter().map(Event::envelope).collect(),
        })
    }

    /// Lists cases with the given status, with derived per-case state.
    pub fn list_cases(
        &self,
        status: CaseStatus,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> PartusResult<CasePage> {
        let limit = self.checked_limit(limit)?;
        let offset = Cursor::decode(cursor)?.seq() as usize;

        let cases = self
            .cases
            .list_by_status(status, offset, limit)
            .map_err(storage_err)?;

        let mut summaries = Vec::with_capacity(cases.len());
        for case in &cases {
            summaries.push(CaseSummary {
                case_id: case.case_id,
                status: case.status,
                labor_active: state::labor_active(case, self.events.as_ref())?,
                postpartum_active: state::postpartum_active(case, self.events.as_ref())?,
                last_event_ts: self
                    .events
                    .last_event_ts(case.case_id)
                    .map_err(storage_err)?,
                active_alerts: state::active_alerts(case, self.events.as_ref())?.len(),
            });
        }

        let next_cursor = if summaries.len() == limit {
            Some(Cursor::at((offset + summaries.len()) as u64).encode())
        } else {
            None
        };

        Ok(CasePage {
            cases: summaries,
            server_cursor: Cursor::at(offset as u64).encode(),
            next_cursor,
        })
    }

    /// The case's currently active alerts.
    pub fn case_alerts(&self, case_id: CaseId) -> PartusResult<Vec<Envelope>> {
        let case = self.require_case(case_id)?;
        Ok(state::active_alerts(&case, self.events.as_ref())?
            .iter()
            .map(Event::envelope)
            .collect())
    }

    /// Derived labor-active flag.
    pub fn labor_active(&self, case_id: CaseId) -> PartusResult<bool> {
        let case = self.require_case(case_id)?;
        state::labor_active(&case, self.events.as_ref())
    }

    /// Derived postpartum-active flag.
    pub fn postpartum_active(&self, case_id: CaseId) -> PartusResult<bool> {
        let case = self.require_case(case_id)?;
        state::postpartum_active(&case, self.events.as_ref())
    }

    /// Acknowledges an alert. The alert stays active.
    pub fn ack_alert(
        &self,
        case_id: CaseId,
        alert_event_id: EventId,
        source: EventSource,
    ) -> PartusResult<Envelope> {
        self.alert_lifecycle(case_id, alert_event_id, source, kinds::ALERT_ACK)
    }

    /// Resolves an alert, deactivating it.
    pub fn resolve_alert(
        &self,
        case_id: CaseId,
        alert_event_id: EventId,
        source: EventSource,
    ) -> PartusResult<Envelope> {
        self.alert_lifecycle(case_id, alert_event_id, source, kinds::ALERT_RESOLVE)
    }

    /// Subscribes to the case's accepted events.
    pub fn watch_case(&self, case_id: CaseId) -> PartusResult<WatchStream> {
        self.require_case(case_id)?;
        Ok(self.watch.subscribe(case_id))
    }

    /// Events dropped from watch streams because a subscriber lagged.
    #[must_use]
    pub fn watch_dropped_events(&self) -> u64 {
        self.watch.dropped_events()
    }

    fn checked_limit(&self, limit: Option<usize>) -> PartusResult<usize> {
        let limit = limit.unwrap_or(self.cfg.feed_default_limit);
        if limit < 1 || limit > self.cfg.feed_max_limit {
            return Err(ValidationError::LimitOutOfRange {
                limit,
                min: 1,
                max: self.cfg.feed_max_limit,
            }
            .into());
        }
        Ok(limit)
    }

    fn alert_lifecycle(
        &self,
        case_id: CaseId,
        alert_event_id: EventId,
        source: EventSource,
        kind: &str,
    ) -> PartusResult<Envelope> {
        let lock = self.case_lock(case_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| PartusError::internal("case lock poisoned"))?;

        let case = self.require_case(case_id)?;
        let target = self
            .events
            .get(alert_event_id)
            .map_err(storage_err)?
            .filter(|e| e.case_id == case_id)
            .ok_or(PartusError::Execution(ExecutionError::EventNotFound {
                id: alert_event_id,
            }))?;
        if target.kind != kinds::ALERT_TRIGGERED {
            return Err(ValidationError::NotAnAlert {
                event_id: alert_event_id.as_uuid(),
            }
            .into());
        }

        let draft = EventDraft::new(kind, Utc::now())
            .with_payload(serde_json::json!({"alert_event_id": alert_event_id.to_string()}));
        let appended = self.append_checked(&case, &draft, source)?;
        self.publish_and_derive(&case, &appended)?;
        Ok(appended.event.envelope())
    }

    /// Scope and authorship checks that apply only to caller-submitted
    /// drafts, then the shared append path.
    fn apply_draft(
        &self,
        case: &Case,
        scope: &SyncScope,
        draft: &EventDraft,
    ) -> PartusResult<Appended> {
        if let Some(submitted) = draft.case_id {
            if submitted != scope.case_id {
                return Err(ExecutionError::ScopeViolation {
                    scope: scope.case_id,
                    submitted,
                }
                .into());
            }
        }
        if draft.kind == kinds::ALERT_TRIGGERED {
            return Err(ValidationError::ReservedKind {
                kind: draft.kind.clone(),
            }
            .into());
        }
        self.append_checked(case, draft, scope.source)
    }

    /// The single append path: kind/payload validation, closed-case
    /// policy, classification, and the idempotent store insert.
    fn append_checked(
        &self,
        case: &Case,
        draft: &EventDraft,
        source: EventSource,
    ) -> PartusResult<Appended> {
        schema::validate_kind(&draft.kind)?;
        if case.is_closed() && !self.cfg.is_closure_exempt(&draft.kind) {
            return Err(ExecutionError::CaseClosed {
                id: case.case_id,
                kind: draft.kind.clone(),
            }
            .into());
        }
        let payload_v = draft.payload_version();
        schema::validate_payload(
            &draft.kind,
            payload_v,
            &draft.payload,
            self.cfg.allow_unknown_kinds,
        )?;

        self.events
            .append(NewEvent {
                event_id: draft.event_id,
                case_id: case.case_id,
                kind: draft.kind.clone(),
                ts: draft.ts,
                server_ts: Utc::now(),
                track: Track::of_kind(&draft.kind),
                source,
                payload_v,
                payload: draft.payload.clone(),
            })
            .map_err(storage_err)
    }

    /// Publishes a freshly accepted event and, for new rows, runs the
    /// milestone pass; emitted alerts go through the same append path
    /// and are published too. Idempotent re-sends change nothing and
    /// trigger nothing.
    fn publish_and_derive(&self, case: &Case, appended: &Appended) -> PartusResult<()> {
        if !appended.newly_inserted {
            return Ok(());
        }
        self.watch.publish(&appended.event.envelope());

        if appended.event.kind == kinds::ALERT_TRIGGERED {
            return Ok(());
        }

        let active = state::active_alert_codes(case, self.events.as_ref())?;
        let labor = self
            .events
            .find_by_track(case.case_id, Track::Labor)
            .map_err(storage_err)?;
        let drafts = self.milestones.pass(&appended.event, &labor, &active);

        for alert in drafts {
            let payload = AlertPayload {
                code: alert.code.clone(),
                severity: alert.severity,
                rule_version: self.cfg.rules.rule_version,
                window_s: self.cfg.rules.window_s,
                summary: alert.summary,
            };
            let draft = EventDraft::new(kinds::ALERT_TRIGGERED, appended.event.ts)
                .with_payload(payload.to_value());
            let stored = self.append_checked(case, &draft, EventSource::System)?;
            info!(case = %case.case_id, code = %alert.code, "alert emitted");
            self.watch.publish(&stored.event.envelope());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryCaseStore, InMemoryEventStore};
    use serde_json::json;

    fn engine() -> SyncEngine {
        SyncEngine::new(
            EngineConfig::default(),
            Arc::new(InMemoryCaseStore::new()),
            Arc::new(InMemoryEventStore::new()),
        )
    }

    fn draft(kind: &str, payload: serde_json::Value) -> EventDraft {
        EventDraft::new(kind, Utc::now()).with_payload(payload)
    }

    #[test]
    fn sync_accepts_and_returns_new_events() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let request = SyncRequest {
            client_time: None,
            cursor: None,
            events: vec![
                draft(kinds::CONTRACTION_START, json!({})),
                draft(kinds::CONTRACTION_END, json!({"duration_s": 62})),
            ],
        };
        let response = engine.sync(&scope, &request).unwrap();

        assert_eq!(response.accepted_event_ids.len(), 2);
        assert!(response.rejected.is_empty());
        assert_eq!(response.new_events.len(), 2);
        assert_eq!(response.server_cursor, "2");
    }

    #[test]
    fn sync_is_idempotent_and_repeats_acceptance() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let event = draft(kinds::CONTRACTION_START, json!({}));
        let request = SyncRequest {
            client_time: None,
            cursor: None,
            events: vec![event.clone(), event.clone()],
        };

        let first = engine.sync(&scope, &request).unwrap();
        assert_eq!(first.accepted_event_ids, vec![event.event_id, event.event_id]);
        assert_eq!(first.new_events.len(), 1);

        let again = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: Some(first.server_cursor.clone()),
                    events: vec![event.clone()],
                },
            )
            .unwrap();
        assert_eq!(again.accepted_event_ids, vec![event.event_id]);
        assert!(again.new_events.is_empty());
        assert_eq!(again.server_cursor, first.server_cursor);
    }

    #[test]
    fn scope_violation_is_rejected_per_event() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let other = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let foreign = draft(kinds::LABOR_EVENT, json!({"kind": "bleeding"}))
            .with_case(other.case_id);
        let ok = draft(kinds::NOTE, json!({"text": "fine"}));
        let response = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![foreign.clone(), ok.clone()],
                },
            )
            .unwrap();

        assert_eq!(response.accepted_event_ids, vec![ok.event_id]);
        assert_eq!(response.rejected.len(), 1);
        assert_eq!(response.rejected[0].event_id, foreign.event_id);
        assert_eq!(response.rejected[0].reason, "case_scope_violation");
        // No row was created for the foreign event in either case.
        assert!(engine.feed(other.case_id, None, None).unwrap().events.is_empty());
    }

    #[test]
    fn track_is_server_authoritative() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let mut event = draft(kinds::CONTRACTION_START, json!({"track": "meta"}));
        event.track = Some(Track::Meta);
        let response = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![event],
                },
            )
            .unwrap();

        assert_eq!(response.new_events[0].track, Track::Labor);
    }

    #[test]
    fn closed_case_rejects_non_exempt_kinds() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);
        engine.close_case(case.case_id).unwrap();

        let response = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![draft(kinds::CONTRACTION_START, json!({}))],
                },
            )
            .unwrap();
        assert_eq!(response.rejected[0].reason, "case_closed");
    }

    #[test]
    fn client_cannot_author_alert_triggers() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let forged = draft(
            kinds::ALERT_TRIGGERED,
            json!({"code": "x", "severity": "high", "summary": "forged"}),
        );
        let response = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![forged],
                },
            )
            .unwrap();
        assert_eq!(response.rejected[0].reason, "reserved_type");
    }

    #[test]
    fn sync_to_missing_case_is_call_level_error() {
        let engine = engine();
        let scope = SyncScope::woman(CaseId::new());
        let err = engine.sync(&scope, &SyncRequest::default()).unwrap_err();
        assert_eq!(err.reason_code(), "case_not_found");
    }

    #[test]
    fn invalid_cursor_is_call_level_error() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);
        let err = engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: Some("bogus".to_string()),
                    events: Vec::new(),
                },
            )
            .unwrap_err();
        assert_eq!(err.reason_code(), "invalid_cursor");
    }

    #[test]
    fn create_case_with_labor_activation_sets_flag() {
        let engine = engine();
        let case = engine.create_case(true).unwrap();
        assert!(engine.labor_active(case.case_id).unwrap());

        let feed = engine.feed(case.case_id, None, None).unwrap();
        assert_eq!(feed.events.len(), 1);
        assert_eq!(feed.events[0].kind, kinds::SET_LABOR_ACTIVE);
        assert_eq!(feed.events[0].source, EventSource::System);
    }

    #[test]
    fn feed_pages_with_next_cursor() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let events = (0..3)
            .map(|i| draft(kinds::NOTE, json!({"text": format!("n{i}")})))
            .collect();
        engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events,
                },
            )
            .unwrap();

        let page1 = engine.feed(case.case_id, None, Some(2)).unwrap();
        assert_eq!(page1.events.len(), 2);
        let next = page1.next_cursor.clone().unwrap();

        let page2 = engine.feed(case.case_id, Some(&next), Some(2)).unwrap();
        assert_eq!(page2.events.len(), 1);
        assert!(page1.events[1].ts <= page2.events[0].ts);
    }

    #[test]
    fn feed_limit_is_validated() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let err = engine.feed(case.case_id, None, Some(0)).unwrap_err();
        assert_eq!(err.reason_code(), "invalid_limit");
        let err = engine.feed(case.case_id, None, Some(500)).unwrap_err();
        assert_eq!(err.reason_code(), "invalid_limit");
    }

    #[test]
    fn list_cases_reports_derived_state() {
        let engine = engine();
        let case = engine.create_case(true).unwrap();
        engine.create_case(false).unwrap();

        let page = engine.list_cases(CaseStatus::Active, None, None).unwrap();
        assert_eq!(page.cases.len(), 2);
        let summary = page
            .cases
            .iter()
            .find(|c| c.case_id == case.case_id)
            .unwrap();
        assert!(summary.labor_active);
        assert!(!summary.postpartum_active);
        assert_eq!(summary.active_alerts, 0);
    }

    #[test]
    fn ack_requires_an_alert_trigger() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let note = draft(kinds::NOTE, json!({}));
        engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![note.clone()],
                },
            )
            .unwrap();

        let err = engine
            .ack_alert(case.case_id, note.event_id, EventSource::Midwife)
            .unwrap_err();
        assert_eq!(err.reason_code(), "not_an_alert");

        let err = engine
            .ack_alert(case.case_id, EventId::new(), EventSource::Midwife)
            .unwrap_err();
        assert_eq!(err.reason_code(), "event_not_found");
    }

    #[test]
    fn watch_sees_accepted_events() {
        let engine = engine();
        let case = engine.create_case(false).unwrap();
        let stream = engine.watch_case(case.case_id).unwrap();
        let scope = SyncScope::woman(case.case_id);

        let event = draft(kinds::CONTRACTION_START, json!({}));
        engine
            .sync(
                &scope,
                &SyncRequest {
                    client_time: None,
                    cursor: None,
                    events: vec![event.clone()],
                },
            )
            .unwrap();

        let seen = stream
            .recv_timeout(std::time::Duration::from_millis(100))
            .unwrap();
        assert_eq!(seen.event_id, event.event_id);
    }
}
