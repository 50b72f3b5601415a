//! Caller authorization for mutating actions.
//!
//! Restriction is opt-in: an empty allow-list means every caller may start
//! and stop the server. This is deliberate, not an oversight; a deployment
//! that wants gating sets `AUTHORIZED_USERS`. Read-only actions are never
//! gated.

use crate::discord::Action;

/// Configured set of caller IDs permitted to run mutating actions.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: Vec<String>,
}

impl AllowList {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// Parse a comma-separated ID list. Blank entries are dropped, so an
    /// unset or empty variable yields the allow-all default.
    pub fn from_csv(raw: &str) -> Self {
        Self {
            ids: raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Decide whether `caller_id` may perform `action`.
    ///
    /// Membership is literal string equality; there is no pattern matching
    /// or role lookup.
    pub fn permits(&self, caller_id: Option<&str>, action: Action) -> bool {
        if !action.is_mutating() {
            return true;
        }
        if self.ids.is_empty() {
            return true;
        }
        match caller_id {
            Some(id) => self.ids.iter().any(|allowed| allowed == id),
            None => false,
        }
    }
}
