use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use partus::{
    kinds, CaseStatus, EngineConfig, EventDraft, EventSource, InMemoryCaseStore,
    InMemoryEventStore, SyncEngine, SyncRequest, SyncScope, Track,
};

fn engine_with(cfg: EngineConfig) -> SyncEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    SyncEngine::new(
        cfg,
        Arc::new(InMemoryCaseStore::new()),
        Arc::new(InMemoryEventStore::new()),
    )
}

fn engine() -> SyncEngine {
    engine_with(EngineConfig::default())
}

fn request(cursor: Option<String>, events: Vec<EventDraft>) -> SyncRequest {
    SyncRequest {
        client_time: None,
        cursor,
        events,
    }
}

#[test]
fn resending_the_same_event_yields_one_row_and_one_sequence_number() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let event = EventDraft::new(kinds::CONTRACTION_START, Utc::now());
    let mut cursors = Vec::new();
    for _ in 0..3 {
        let response = engine
            .sync(&scope, &request(None, vec![event.clone()]))
            .unwrap();
        // The identifier is accepted on every call, including re-sends.
        assert_eq!(response.accepted_event_ids, vec![event.event_id]);
        cursors.push(response.server_cursor);
    }

    assert!(cursors.iter().all(|c| c == &cursors[0]));
    let feed = engine.feed(case.case_id, None, None).unwrap();
    assert_eq!(feed.events.len(), 1);
}

#[test]
fn server_cursor_never_goes_backwards() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let mut cursor: Option<String> = None;
    let mut last_seen = 0u64;
    for i in 0..5 {
        let event = EventDraft::new(kinds::NOTE, Utc::now())
            .with_payload(json!({"text": format!("note {i}")}));
        let response = engine.sync(&scope, &request(cursor.clone(), vec![event])).unwrap();
        let numeric: u64 = response.server_cursor.parse().unwrap();
        assert!(numeric >= last_seen);
        last_seen = numeric;
        cursor = Some(response.server_cursor);
    }
}

#[test]
fn declared_track_is_overridden_by_the_classifier() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    // Wrong track on the envelope and a conflicting claim in the payload.
    let mut event = EventDraft::new(kinds::POSTPARTUM_CHECKIN, Utc::now())
        .with_payload(json!({"items": {"bleeding": "light"}, "track": "labor"}));
    event.track = Some(Track::Labor);

    let response = engine.sync(&scope, &request(None, vec![event])).unwrap();
    assert_eq!(response.new_events[0].track, Track::Postpartum);
}

#[test]
fn toggle_flags_follow_the_latest_event_and_case_closure() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let on = EventDraft::new(kinds::SET_LABOR_ACTIVE, Utc::now())
        .with_payload(json!({"active": true}));
    engine.sync(&scope, &request(None, vec![on])).unwrap();
    assert!(engine.labor_active(case.case_id).unwrap());

    let off = EventDraft::new(kinds::SET_LABOR_ACTIVE, Utc::now())
        .with_payload(json!({"active": false}));
    engine.sync(&scope, &request(None, vec![off])).unwrap();
    assert!(!engine.labor_active(case.case_id).unwrap());

    let on_again = EventDraft::new(kinds::SET_LABOR_ACTIVE, Utc::now())
        .with_payload(json!({"active": true}));
    engine.sync(&scope, &request(None, vec![on_again])).unwrap();
    assert!(engine.labor_active(case.case_id).unwrap());

    engine.close_case(case.case_id).unwrap();
    assert!(!engine.labor_active(case.case_id).unwrap());
}

#[test]
fn scoped_writer_cannot_touch_another_case() {
    let engine = engine();
    let case_a = engine.create_case(false).unwrap();
    let case_b = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case_a.case_id);

    let malicious = EventDraft::new(kinds::LABOR_EVENT, Utc::now())
        .with_payload(json!({"kind": "bleeding", "severity": "high"}))
        .with_case(case_b.case_id);

    let response = engine
        .sync(&scope, &request(None, vec![malicious.clone()]))
        .unwrap();
    assert!(response.accepted_event_ids.is_empty());
    assert_eq!(response.rejected[0].event_id, malicious.event_id);
    assert_eq!(response.rejected[0].reason, "case_scope_violation");

    assert!(engine.feed(case_b.case_id, None, None).unwrap().events.is_empty());
    assert!(engine.feed(case_a.case_id, None, None).unwrap().events.is_empty());
}

#[test]
fn contraction_pair_round_trip() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
    let start = EventDraft::new(kinds::CONTRACTION_START, t0);
    let end = EventDraft::new(kinds::CONTRACTION_END, t0 + Duration::seconds(62))
        .with_payload(json!({"duration_s": 62}));

    let response = engine
        .sync(&scope, &request(None, vec![start.clone(), end.clone()]))
        .unwrap();
    assert_eq!(
        response.accepted_event_ids,
        vec![start.event_id, end.event_id]
    );
    assert_eq!(response.server_cursor, "2");

    // A later sync from the old cursor replays both, in order.
    let replay = engine.sync(&scope, &request(None, Vec::new())).unwrap();
    assert_eq!(replay.new_events.len(), 2);
    assert_eq!(replay.new_events[0].event_id, start.event_id);
    assert_eq!(replay.new_events[1].event_id, end.event_id);

    // And from the new cursor, nothing.
    let quiet = engine
        .sync(&scope, &request(Some(response.server_cursor), Vec::new()))
        .unwrap();
    assert!(quiet.new_events.is_empty());
}

#[test]
fn malformed_events_do_not_abort_the_batch() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let bad_payload = EventDraft::new(kinds::SET_LABOR_ACTIVE, Utc::now())
        .with_payload(json!({"active": "yes"}));
    let unknown = EventDraft::new("wearable_sample", Utc::now()).with_payload(json!({"hr": 88}));
    let good = EventDraft::new(kinds::NOTE, Utc::now()).with_payload(json!({"text": "ok"}));

    let response = engine
        .sync(
            &scope,
            &request(None, vec![bad_payload.clone(), unknown.clone(), good.clone()]),
        )
        .unwrap();

    assert_eq!(response.accepted_event_ids, vec![good.event_id]);
    let reasons: Vec<(partus::EventId, &str)> = response
        .rejected
        .iter()
        .map(|r| (r.event_id, r.reason.as_str()))
        .collect();
    assert!(reasons.contains(&(bad_payload.event_id, "payload_invalid")));
    assert!(reasons.contains(&(unknown.event_id, "unknown_type")));
}

#[test]
fn passthrough_mode_accepts_unknown_kinds() {
    let engine = engine_with(EngineConfig {
        allow_unknown_kinds: true,
        ..EngineConfig::default()
    });
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let unknown = EventDraft::new("wearable_sample", Utc::now()).with_payload(json!({"hr": 88}));
    let response = engine
        .sync(&scope, &request(None, vec![unknown.clone()]))
        .unwrap();
    assert_eq!(response.accepted_event_ids, vec![unknown.event_id]);
    // Unknown kinds still classify, into meta.
    assert_eq!(response.new_events[0].track, Track::Meta);
}

#[test]
fn closed_case_still_accepts_alert_lifecycle_kinds() {
    let engine = engine();
    let case = engine.create_case(false).unwrap();
    let scope = SyncScope::woman(case.case_id);

    // Trip a direct-signal alert, then close the case.
    let report = EventDraft::new(kinds::LABOR_EVENT, Utc::now())
        .with_payload(json!({"kind": "bleeding", "severity": "high"}));
    let response = engine.sync(&scope, &request(None, vec![report])).unwrap();
    let alert = response
        .new_events
        .iter()
        .find(|e| e.kind == kinds::ALERT_TRIGGERED)
        .expect("alert emitted");
    engine.close_case(case.case_id).unwrap();

    let ack = EventDraft::new(kinds::ALERT_ACK, Utc::now())
        .with_payload(json!({"alert_event_id": alert.event_id.to_string()}));
    let note = EventDraft::new(kinds::NOTE, Utc::now()).with_payload(json!({"text": "late"}));
    let response = engine
        .sync(&scope, &request(None, vec![ack.clone(), note.clone()]))
        .unwrap();

    assert_eq!(response.accepted_event_ids, vec![ack.event_id]);
    assert_eq!(response.rejected[0].event_id, note.event_id);
    assert_eq!(response.rejected[0].reason, "case_closed");
}

#[test]
fn feed_and_case_listing_reflect_synced_state() {
    let engine = engine();
    let case = engine.create_case(true).unwrap();
    let scope = SyncScope::woman(case.case_id);

    let checkin = EventDraft::new(kinds::POSTPARTUM_CHECKIN, Utc::now())
        .with_payload(json!({"items": {"bleeding": "light", "fever": "no"}}));
    engine.sync(&scope, &request(None, vec![checkin])).unwrap();

    let feed = engine.feed(case.case_id, None, Some(10)).unwrap();
    assert_eq!(feed.events.len(), 2); // system toggle + checkin
    assert_eq!(feed.events[0].source, EventSource::System);
    assert_eq!(feed.events[1].source, EventSource::Woman);

    let page = engine.list_cases(CaseStatus::Active, None, None).unwrap();
    assert_eq!(page.cases.len(), 1);
    assert!(page.cases[0].labor_active);
    assert!(page.cases[0].last_event_ts.is_some());
}
