//! Request identifiers for latest-only async results.

use std::fmt;

/// Opaque, monotonically increasing id for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tracks the latest issued request and rejects stale results.
#[derive(Debug, Default)]
pub struct LatestOnly {
    next: u64,
    active: Option<RequestId>,
}

impl LatestOnly {
    /// Issues a new id and makes it the only active one.
    pub fn begin(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        self.active = Some(id);
        id
    }

    /// Returns true if `id` is the most recently issued, unfinished request.
    pub fn is_active(&self, id: RequestId) -> bool {
        self.active == Some(id)
    }

    /// Finishes the request if it is still the active one.
    ///
    /// Returns false for superseded ids; their results must be dropped.
    pub fn finish_if_active(&mut self, id: RequestId) -> bool {
        if self.is_active(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}
