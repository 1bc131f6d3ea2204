//! Alert and milestone subsystem.
//!
//! Alerts are ordinary events: a rule pass emits `alert_triggered`
//! events through the same append path as everything else, and the
//! acknowledge/resolve lifecycle is likewise just events referencing the
//! trigger. Activity is derived, never stored.

mod engine;
mod rules;

pub use engine::{AlertDraft, MilestoneEngine};
pub use rules::{codes, AlertPayload, AlertSeverity, DirectSignalRule, RuleConfig, RULE_VERSION};
