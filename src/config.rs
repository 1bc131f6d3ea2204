//! Engine configuration.
//!
//! Plain structs with defaults; there is no configuration-file layer.
//! Rule parameters live in [`RuleConfig`] so they can be versioned
//! independently of the store-level switches here.

use crate::alerts::RuleConfig;
use crate::event::kinds;

/// Store and sync configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Accept kinds (and payload versions) outside the known vocabulary.
    /// Off by default: unknown kinds are rejected per-event.
    pub allow_unknown_kinds: bool,
    /// Kinds that may still be appended to a closed case.
    pub closure_exempt_kinds: Vec<String>,
    /// Maximum events returned by one sync call.
    pub sync_page_limit: usize,
    /// Default feed page size.
    pub feed_default_limit: usize,
    /// Maximum feed page size.
    pub feed_max_limit: usize,
    /// Per-subscriber watch stream buffer capacity.
    pub watch_capacity: usize,
    /// Milestone rule parameters.
    pub rules: RuleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_unknown_kinds: false,
            closure_exempt_kinds: vec![
                kinds::ALERT_ACK.to_string(),
                kinds::ALERT_RESOLVE.to_string(),
            ],
            sync_page_limit: 200,
            feed_default_limit: 50,
            feed_max_limit: 200,
            watch_capacity: 256,
            rules: RuleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Returns true if the kind may be written to a closed case.
    #[must_use]
    pub fn is_closure_exempt(&self, kind: &str) -> bool {
        self.closure_exempt_kinds.iter().any(|k| k == kind)
    }
}
