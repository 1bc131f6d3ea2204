//! # Partus — offline-tolerant case event synchronization
//!
//! Partus coordinates two offline-capable client populations — a woman's
//! device and her midwives' devices — around a shared, append-only log
//! of timestamped events belonging to a case. The engine provides:
//!
//! - **Event store**: a durable, append-only ledger keyed by
//!   client-generated identifier, with server-assigned monotonic
//!   sequence numbers and idempotent insertion.
//! - **Classification**: a pure, total kind→track function; the server
//!   is the single source of truth for grouping.
//! - **Sync**: batched, idempotent, cursor-resumable exchange; partial
//!   failure is per-event, never batch-fatal.
//! - **Derived state**: case flags and alert activity computed from the
//!   log at read time, never stored.
//! - **Milestones**: a deterministic rule pass over the labor window
//!   that emits alerts as ordinary events through the same append path.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use partus::{
//!     EngineConfig, EventDraft, InMemoryCaseStore, InMemoryEventStore, SyncEngine,
//!     SyncRequest, SyncScope,
//! };
//!
//! let engine = SyncEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(InMemoryCaseStore::new()),
//!     Arc::new(InMemoryEventStore::new()),
//! );
//!
//! let case = engine.create_case(true).unwrap();
//! let scope = SyncScope::woman(case.case_id);
//! let request = SyncRequest {
//!     client_time: None,
//!     cursor: None,
//!     events: vec![EventDraft::new("contraction_start", chrono::Utc::now())],
//! };
//! let response = engine.sync(&scope, &request).unwrap();
//! assert_eq!(response.accepted_event_ids.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alerts;
pub mod case;
pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod schema;
pub mod state;
pub mod storage;
pub mod sync;
pub mod track;
pub mod watch;

// Re-export primary types at crate root for convenience
pub use alerts::{AlertPayload, AlertSeverity, DirectSignalRule, MilestoneEngine, RuleConfig};
pub use case::{Case, CaseId, CaseStatus};
pub use config::EngineConfig;
pub use cursor::Cursor;
pub use error::{ExecutionError, PartusError, PartusResult, ValidationError};
pub use event::{kinds, Envelope, Event, EventDraft, EventId, EventSource};
pub use storage::{
    Appended, CaseStore, EventStore, InMemoryCaseStore, InMemoryEventStore, NewEvent, StorageError,
};
pub use sync::{
    CasePage, CaseSummary, FeedPage, Rejected, SyncEngine, SyncRequest, SyncResponse, SyncScope,
};
pub use track::Track;
pub use watch::{WatchHub, WatchStream};
