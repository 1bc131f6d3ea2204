//! Read-time state derivation.
//!
//! Case-level flags and alert activity are computed views over the
//! ordered event log, never stored columns, so they cannot drift from
//! the events that define them.

use std::collections::HashSet;

use crate::case::Case;
use crate::error::{ExecutionError, PartusError, PartusResult};
use crate::event::{kinds, Event, EventId};
use crate::storage::{EventStore, StorageError};

fn storage_err(err: StorageError) -> PartusError {
    PartusError::Execution(ExecutionError::Storage {
        message: err.to_string(),
    })
}

/// Value of a boolean toggle flag: the `payload.active` field of the
/// highest-sequence event of `toggle_kind`, `false` when no such event
/// exists, and unconditionally `false` once the case is closed.
pub fn toggle_flag(
    case: &Case,
    events: &dyn EventStore,
    toggle_kind: &str,
) -> PartusResult<bool> {
    if case.is_closed() {
        return Ok(false);
    }
    let latest = events
        .latest_by_kind(case.case_id, toggle_kind)
        .map_err(storage_err)?;
    Ok(latest
        .and_then(|e| e.payload.get("active").and_then(serde_json::Value::as_bool))
        .unwrap_or(false))
}

/// Derived labor-active flag.
pub fn labor_active(case: &Case, events: &dyn EventStore) -> PartusResult<bool> {
    toggle_flag(case, events, kinds::SET_LABOR_ACTIVE)
}

/// Derived postpartum-active flag.
pub fn postpartum_active(case: &Case, events: &dyn EventStore) -> PartusResult<bool> {
    toggle_flag(case, events, kinds::SET_POSTPARTUM_ACTIVE)
}

/// Alert triggers with no `alert_resolve` referencing them, ascending by
/// sequence. Acknowledgements never deactivate an alert.
pub fn active_alerts(case: &Case, events: &dyn EventStore) -> PartusResult<Vec<Event>> {
    let triggered = events
        .find_by_kind(case.case_id, kinds::ALERT_TRIGGERED)
        .map_err(storage_err)?;
    if triggered.is_empty() {
        return Ok(Vec::new());
    }

    let resolves = events
        .find_by_kind(case.case_id, kinds::ALERT_RESOLVE)
        .map_err(storage_err)?;
    let resolved: HashSet<EventId> = resolves
        .iter()
        .filter_map(|e| e.payload.get("alert_event_id"))
        .filter_map(serde_json::Value::as_str)
        .filter_map(|s| s.parse().ok())
        .map(EventId::from_uuid)
        .collect();

    Ok(triggered
        .into_iter()
        .filter(|e| !resolved.contains(&e.event_id))
        .collect())
}

/// Codes of the currently active alerts. Used by the milestone pass to
/// suppress duplicate active alerts of the same code.
pub fn active_alert_codes(case: &Case, events: &dyn EventStore) -> PartusResult<HashSet<String>> {
    Ok(active_alerts(case, events)?
        .iter()
        .filter_map(|e| e.payload.get("code"))
        .filter_map(serde_json::Value::as_str)
        .map(str::to_string)
        .collect())
}
