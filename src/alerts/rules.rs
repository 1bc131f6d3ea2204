//! Alert rule parameters and payload shapes.
//!
//! Rules are data: a versioned parameter set evaluated by the engine.
//! Every emitted alert records the rule version and window size it was
//! evaluated under, so past alerts stay auditable after parameters
//! change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::kinds;

/// Version stamped into every alert emitted by the current rule set.
pub const RULE_VERSION: u32 = 1;

/// Rule codes carried in `alert_triggered` payloads.
pub mod codes {
    /// Contractions reached a regular, sustained rhythm.
    pub const CONTRACTION_PATTERN: &str = "contraction_pattern";
    /// An established rhythm degraded: gaps widened beyond tolerance.
    pub const CONTRACTION_REGRESSION: &str = "contraction_regression";
    /// No contraction for longer than the configured maximum after a
    /// rhythm was established.
    pub const CONTRACTION_GAP: &str = "contraction_gap";
    /// A report flagged as high severity on ingest.
    pub const HIGH_SEVERITY_REPORT: &str = "high_severity_report";
}

/// Severity attached to an emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    High,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A direct-signal rule: a payload field match that bypasses windowing
/// and fires immediately on ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectSignalRule {
    /// Event kind the rule applies to.
    pub kind: String,
    /// Dot-separated path into the payload, e.g. `items.bleeding`.
    pub field: String,
    /// String value that fires the rule.
    pub equals: String,
    /// Code of the emitted alert.
    pub code: String,
    /// Severity of the emitted alert.
    pub severity: AlertSeverity,
}

impl DirectSignalRule {
    /// Creates a direct-signal rule.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        field: impl Into<String>,
        equals: impl Into<String>,
        code: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            equals: equals.into(),
            code: code.into(),
            severity,
        }
    }
}

/// Parameters for the milestone rules.
///
/// All interval comparisons against the tolerance band and all duration
/// thresholds are inclusive; the silence check for the gap rule is
/// strictly greater than `max_silence_s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Version recorded on emitted alerts.
    pub rule_version: u32,
    /// Sliding window over labor-track events, in seconds.
    pub window_s: i64,
    /// Target start-to-start contraction gap, in seconds.
    pub interval_s: i64,
    /// Tolerance around the target gap; a gap within
    /// `[interval_s - tolerance_s, interval_s + tolerance_s]` qualifies.
    pub tolerance_s: i64,
    /// Minimum count of consecutive qualifying gaps for an established
    /// rhythm.
    pub min_intervals: usize,
    /// The qualifying run must span at least this long, in seconds.
    pub min_duration_s: i64,
    /// Consecutive over-wide gaps that count as a regression.
    pub regression_intervals: usize,
    /// Silence after an established rhythm that counts as abnormal, in
    /// seconds.
    pub max_silence_s: i64,
    /// Direct-signal rules evaluated on every ingest.
    pub direct_signals: Vec<DirectSignalRule>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            rule_version: RULE_VERSION,
            window_s: 4 * 3600,
            interval_s: 300,
            tolerance_s: 120,
            min_intervals: 6,
            min_duration_s: 1800,
            regression_intervals: 3,
            max_silence_s: 1800,
            direct_signals: vec![
                DirectSignalRule::new(
                    kinds::LABOR_EVENT,
                    "severity",
                    "high",
                    codes::HIGH_SEVERITY_REPORT,
                    AlertSeverity::High,
                ),
                DirectSignalRule::new(
                    kinds::POSTPARTUM_CHECKIN,
                    "items.bleeding",
                    "heavy",
                    codes::HIGH_SEVERITY_REPORT,
                    AlertSeverity::High,
                ),
                DirectSignalRule::new(
                    kinds::POSTPARTUM_CHECKIN,
                    "items.fever",
                    "yes",
                    codes::HIGH_SEVERITY_REPORT,
                    AlertSeverity::High,
                ),
            ],
        }
    }
}

impl RuleConfig {
    /// Lower edge of the qualifying gap band (inclusive).
    #[must_use]
    pub const fn band_min_s(&self) -> i64 {
        self.interval_s - self.tolerance_s
    }

    /// Upper edge of the qualifying gap band (inclusive).
    #[must_use]
    pub const fn band_max_s(&self) -> i64 {
        self.interval_s + self.tolerance_s
    }
}

/// Payload written into every `alert_triggered` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Rule code.
    pub code: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Rule set version at emission time.
    pub rule_version: u32,
    /// Window size the rule evaluated over, in seconds.
    pub window_s: i64,
    /// Human-readable explanation of why the rule fired.
    pub summary: String,
}

impl AlertPayload {
    /// Serializes into the event payload value.
    ///
    /// # Panics
    ///
    /// Never: the struct serializes infallibly to a JSON object.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("alert payload serializes")
    }
}
