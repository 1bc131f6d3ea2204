//! Kind-to-track classification.
//!
//! The track is the single server-authoritative grouping of an event.
//! Clients may send a track on the wire; it is always ignored and
//! re-derived here so that two client versions can never disagree about
//! where an event belongs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::kinds;

/// The three tracks a case's events fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Labor-phase events: contractions, labor observations, the labor toggle.
    Labor,
    /// Postpartum-phase events: check-ins, the postpartum toggle.
    Postpartum,
    /// Administrative events: alerts, notes, tasks, anything unknown.
    Meta,
}

impl Track {
    /// Classifies a kind into its track.
    ///
    /// Total over all strings: unknown kinds land in [`Track::Meta`]
    /// rather than failing. Acceptance of unknown kinds is a separate
    /// store-level decision; classification never is.
    #[must_use]
    pub fn of_kind(kind: &str) -> Self {
        if kind.starts_with("contraction_") {
            return Self::Labor;
        }

        match kind {
            kinds::LABOR_EVENT | kinds::SET_LABOR_ACTIVE => Self::Labor,
            kinds::POSTPARTUM_CHECKIN | kinds::SET_POSTPARTUM_ACTIVE => Self::Postpartum,
            _ if kind.starts_with("alert_") => Self::Meta,
            kinds::NOTE | kinds::VISIT_TASK => Self::Meta,
            _ => Self::Meta,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Labor => write!(f, "labor"),
            Self::Postpartum => write!(f, "postpartum"),
            Self::Meta => write!(f, "meta"),
        }
    }
}
