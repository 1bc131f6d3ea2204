//! Milestone evaluation over the labor window.
//!
//! The engine is a pure function of the event history: given the
//! triggering event, the case's labor-track events, and the set of
//! currently active alert codes, it decides which alerts to emit. No
//! clock reads, no randomness, no external calls — identical histories
//! always produce identical emissions. The reference instant for every
//! windowed rule is the triggering event's originator timestamp.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::event::{kinds, Event};
use crate::track::Track;

use super::rules::{codes, AlertSeverity, RuleConfig};

/// An alert the engine decided to emit. The sync path turns drafts into
/// ordinary `alert_triggered` events through the normal append path.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    /// Rule code.
    pub code: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Human-readable explanation.
    pub summary: String,
}

/// Deterministic milestone engine.
#[derive(Debug, Clone)]
pub struct MilestoneEngine {
    cfg: RuleConfig,
}

impl MilestoneEngine {
    /// Creates an engine with the given rule parameters.
    #[must_use]
    pub const fn new(cfg: RuleConfig) -> Self {
        Self { cfg }
    }

    /// The rule parameters in effect.
    #[must_use]
    pub const fn config(&self) -> &RuleConfig {
        &self.cfg
    }

    /// Runs one evaluation pass for a freshly appended event.
    ///
    /// `labor_events` is the case's labor-track history in sequence
    /// order; the engine narrows it to the sliding window itself.
    /// `active_codes` holds the codes of currently active alerts;
    /// windowed rules will not re-fire a code that is still active.
    /// Direct signals are per-incident and bypass that dedup.
    #[must_use]
    pub fn pass(
        &self,
        trigger: &Event,
        labor_events: &[Event],
        active_codes: &HashSet<String>,
    ) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();

        drafts.extend(self.direct_signals(trigger));

        if trigger.track == Track::Labor {
            let reference = trigger.ts;
            let starts = self.window_starts(labor_events, reference);

            if let Some(draft) = self.frequency_milestone(&starts) {
                if !active_codes.contains(&draft.code) {
                    drafts.push(draft);
                }
            }
            if let Some(draft) = self.regression(&starts) {
                if !active_codes.contains(&draft.code) {
                    drafts.push(draft);
                }
            }
            if let Some(draft) = self.abnormal_gap(&starts, reference) {
                if !active_codes.contains(&draft.code) {
                    drafts.push(draft);
                }
            }
        }

        if !drafts.is_empty() {
            debug!(
                trigger = %trigger.event_id,
                count = drafts.len(),
                "milestone pass produced alerts"
            );
        }
        drafts
    }

    fn direct_signals(&self, trigger: &Event) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();
        for rule in &self.cfg.direct_signals {
            if rule.kind != trigger.kind {
                continue;
            }
            let Some(value) = lookup_path(&trigger.payload, &rule.field) else {
                continue;
            };
            if value.as_str() == Some(rule.equals.as_str()) {
                drafts.push(AlertDraft {
                    code: rule.code.clone(),
                    severity: rule.severity,
                    summary: format!(
                        "{} reported {}={}",
                        trigger.kind, rule.field, rule.equals
                    ),
                });
            }
        }
        drafts
    }

    /// Contraction start timestamps inside the window ending at
    /// `reference`, ascending.
    fn window_starts(
        &self,
        labor_events: &[Event],
        reference: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let window_open = reference - chrono::Duration::seconds(self.cfg.window_s);
        let mut starts: Vec<DateTime<Utc>> = labor_events
            .iter()
            .filter(|e| e.kind == kinds::CONTRACTION_START)
            .map(|e| e.ts)
            .filter(|ts| *ts >= window_open && *ts <= reference)
            .collect();
        starts.sort_unstable();
        starts
    }

    /// Start-to-start gap in whole seconds.
    fn gaps(starts: &[DateTime<Utc>]) -> Vec<i64> {
        starts
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_seconds())
            .collect()
    }

    /// A gap qualifies when it sits inside the tolerance band,
    /// boundaries included.
    fn qualifies(&self, gap_s: i64) -> bool {
        gap_s >= self.cfg.band_min_s() && gap_s <= self.cfg.band_max_s()
    }

    /// Length of the run of qualifying gaps ending at the latest start,
    /// together with the time the run spans.
    fn trailing_run(&self, starts: &[DateTime<Utc>]) -> (usize, i64) {
        let gaps = Self::gaps(starts);
        let run = gaps
            .iter()
            .rev()
            .take_while(|&&g| self.qualifies(g))
            .count();
        if run == 0 {
            return (0, 0);
        }
        let first = starts[starts.len() - 1 - run];
        let last = starts[starts.len() - 1];
        (run, (last - first).num_seconds())
    }

    /// True when any consecutive run of qualifying gaps inside the
    /// window meets both the count and the duration thresholds.
    fn established_anywhere(&self, starts: &[DateTime<Utc>]) -> bool {
        let gaps = Self::gaps(starts);
        let mut run_start = 0usize;
        let mut run_len = 0usize;
        for (i, &gap) in gaps.iter().enumerate() {
            if self.qualifies(gap) {
                if run_len == 0 {
                    run_start = i;
                }
                run_len += 1;
                if run_len >= self.cfg.min_intervals {
                    let span = (starts[i + 1] - starts[run_start]).num_seconds();
                    if span >= self.cfg.min_duration_s {
                        return true;
                    }
                }
            } else {
                run_len = 0;
            }
        }
        false
    }

    fn frequency_milestone(&self, starts: &[DateTime<Utc>]) -> Option<AlertDraft> {
        let (run, span_s) = self.trailing_run(starts);
        if run < self.cfg.min_intervals || span_s < self.cfg.min_duration_s {
            return None;
        }
        Some(AlertDraft {
            code: codes::CONTRACTION_PATTERN.to_string(),
            severity: AlertSeverity::Warning,
            summary: format!(
                "{} contractions {}-{} min apart sustained over {} min",
                run + 1,
                self.cfg.band_min_s() / 60,
                self.cfg.band_max_s() / 60,
                span_s / 60
            ),
        })
    }

    fn regression(&self, starts: &[DateTime<Utc>]) -> Option<AlertDraft> {
        if !self.established_anywhere(starts) {
            return None;
        }
        let gaps = Self::gaps(starts);
        let wide = gaps
            .iter()
            .rev()
            .take_while(|&&g| g > self.cfg.band_max_s())
            .count();
        if wide < self.cfg.regression_intervals {
            return None;
        }
        Some(AlertDraft {
            code: codes::CONTRACTION_REGRESSION.to_string(),
            severity: AlertSeverity::Warning,
            summary: format!(
                "contraction gaps widened beyond {} min for the last {} intervals",
                self.cfg.band_max_s() / 60,
                wide
            ),
        })
    }

    fn abnormal_gap(
        &self,
        starts: &[DateTime<Utc>],
        reference: DateTime<Utc>,
    ) -> Option<AlertDraft> {
        if !self.established_anywhere(starts) {
            return None;
        }
        let last = *starts.last()?;
        let silence_s = (reference - last).num_seconds();
        if silence_s <= self.cfg.max_silence_s {
            return None;
        }
        Some(AlertDraft {
            code: codes::CONTRACTION_GAP.to_string(),
            severity: AlertSeverity::Warning,
            summary: format!(
                "no contraction for {} min after an established pattern (limit {} min)",
                silence_s / 60,
                self.cfg.max_silence_s / 60
            ),
        })
    }
}

fn lookup_path<'a>(payload: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = payload;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
