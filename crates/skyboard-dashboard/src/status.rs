//! Tri-state outcome indicator for user-triggered actions (save, export).
//!
//! A finished action shows `Success` or `Error` for a fixed delay and then
//! drops back to `Idle`. Starting another action before the delay expires
//! cancels the pending clear.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::sequence::RequestSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Idle,
    InProgress,
    Success,
    Error,
}

impl ActionStatus {
    pub fn is_busy(self) -> bool {
        self == ActionStatus::InProgress
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActionStatus::Idle => "idle",
            ActionStatus::InProgress => "in progress",
            ActionStatus::Success => "success",
            ActionStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Shared status cell with auto-clear. Clones observe the same status.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    state: Arc<watch::Sender<ActionStatus>>,
    sequence: RequestSequence,
    clear_after: Duration,
}

impl StatusTracker {
    pub fn new(clear_after: Duration) -> Self {
        let (state, _) = watch::channel(ActionStatus::Idle);
        Self {
            state: Arc::new(state),
            sequence: RequestSequence::new(),
            clear_after,
        }
    }

    pub fn get(&self) -> ActionStatus {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionStatus> {
        self.state.subscribe()
    }

    /// Enter `InProgress`. Returns false if an action is already running.
    pub fn try_begin(&self) -> bool {
        let (_, started) = self.sequence.begin(|| {
            self.state.send_if_modified(|status| {
                if status.is_busy() {
                    return false;
                }
                *status = ActionStatus::InProgress;
                true
            })
        });
        started
    }

    /// Record the outcome and schedule the return to `Idle`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn finish(&self, succeeded: bool) {
        let outcome = if succeeded {
            ActionStatus::Success
        } else {
            ActionStatus::Error
        };
        let (ticket, _) = self.sequence.begin(|| self.state.send_replace(outcome));

        let state = Arc::clone(&self.state);
        let sequence = self.sequence.clone();
        let delay = self.clear_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sequence
                .complete(ticket, || state.send_replace(ActionStatus::Idle))
                .is_none()
            {
                debug!("Status changed before clear; leaving it");
            }
        });
    }
}
