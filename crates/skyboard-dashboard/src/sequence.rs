//! Latest-request-wins bookkeeping.
//!
//! Every request issued by a view takes a [`Ticket`]. When the response
//! arrives it may only be published if no newer ticket has been issued in
//! the meantime. Publishing happens under the same lock that issues
//! tickets, so a stale completion can never overwrite a newer state.

use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Monotonic request counter shared by clones.
#[derive(Debug, Clone, Default)]
pub struct RequestSequence {
    latest: Arc<Mutex<u64>>,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding all earlier ones, and run `publish`
    /// before any completion can observe it.
    pub fn begin<R>(&self, publish: impl FnOnce() -> R) -> (Ticket, R) {
        let mut latest = self.latest.lock();
        *latest += 1;
        let ticket = Ticket(*latest);
        (ticket, publish())
    }

    /// Run `publish` only if `ticket` is still the newest one.
    pub fn complete<R>(&self, ticket: Ticket, publish: impl FnOnce() -> R) -> Option<R> {
        let latest = self.latest.lock();
        if *latest != ticket.0 {
            return None;
        }
        Some(publish())
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        *self.latest.lock() == ticket.0
    }
}
