//! Opaque sync cursors.
//!
//! A cursor wraps the last sequence number a caller has fully consumed.
//! It is minted only by the store, advances monotonically, and never
//! derives from wall-clock time, so device clock skew cannot reorder a
//! resumed sync. Callers echo the string back verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A position in a case's event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(u64);

impl Cursor {
    /// The cursor before any event: everything is new.
    pub const START: Self = Self(0);

    /// Wraps a sequence number.
    #[must_use]
    pub const fn at(seq: u64) -> Self {
        Self(seq)
    }

    /// The sequence number this cursor has consumed through.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }

    /// Renders the wire form.
    #[must_use]
    pub fn encode(self) -> String {
        self.0.to_string()
    }

    /// Parses a wire cursor. `None` and the empty string mean
    /// [`Cursor::START`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidCursor` for anything that is not a base-10
    /// unsigned integer.
    pub fn decode(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw {
            None | Some("") => Ok(Self::START),
            Some(text) => text
                .parse::<u64>()
                .map(Self)
                .map_err(|_| ValidationError::InvalidCursor {
                    cursor: text.to_string(),
                }),
        }
    }

    /// Returns the later of two cursors.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
