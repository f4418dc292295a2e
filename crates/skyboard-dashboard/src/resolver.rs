//! Turns typed location text into coordinates.
//!
//! Keystrokes update the input immediately. The input becomes the committed
//! location either after it has been quiet for the debounce delay or on
//! explicit submission, depending on [`CommitMode`]. Each commit of a
//! non-empty name issues exactly one geocode request; only the response for
//! the most recent commit is published.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skyboard_core::{AppError, CommitMode};
use skyboard_weather::{Coordinates, WeatherApiClient};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::map::map_embed_url;
use crate::sequence::{RequestSequence, Ticket};

/// Looks up coordinates for a place name.
pub trait Geocoder: Send + Sync + 'static {
    fn geocode(&self, name: &str) -> impl Future<Output = Result<Coordinates, AppError>> + Send;
}

impl Geocoder for WeatherApiClient {
    async fn geocode(&self, name: &str) -> Result<Coordinates, AppError> {
        self.locate(name).await
    }
}

impl<G: Geocoder> Geocoder for Arc<G> {
    async fn geocode(&self, name: &str) -> Result<Coordinates, AppError> {
        (**self).geocode(name).await
    }
}

/// Resolution progress for the committed location
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolutionState {
    /// Nothing committed, or the committed name was blank
    #[default]
    Idle,
    Pending { name: String },
    Resolved { name: String, coordinates: Coordinates },
    Failed { name: String, error: String },
}

impl ResolutionState {
    pub fn name(&self) -> Option<&str> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Pending { name }
            | ResolutionState::Resolved { name, .. }
            | ResolutionState::Failed { name, .. } => Some(name.as_str()),
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            ResolutionState::Resolved { coordinates, .. } => Some(*coordinates),
            _ => None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.longitude)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ResolutionState::Failed { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ResolutionState::Pending { .. })
    }

    /// True once the geocode request for the committed name has answered.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ResolutionState::Resolved { .. } | ResolutionState::Failed { .. }
        )
    }

    pub fn map_url(&self) -> Option<String> {
        map_embed_url(self.latitude(), self.longitude())
    }

    /// Flattened view: the committed name with coordinates when known.
    pub fn location(&self) -> ResolvedLocation {
        ResolvedLocation {
            name: self.name().unwrap_or_default().to_string(),
            latitude: self.latitude(),
            longitude: self.longitude(),
        }
    }
}

/// Committed name plus coordinates, absent while pending or after a failure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedLocation {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One accepted commit. `generation` grows by one per commit, so a forced
/// resubmission of the same name is still observable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    pub generation: u64,
    pub name: String,
}

/// Message shown when the geocode request itself failed.
fn failure_message(err: &AppError) -> String {
    match err {
        AppError::Application(detail) => detail.clone(),
        other => format!("Failed to fetch location data: {}", other),
    }
}

struct Shared<G> {
    geocoder: G,
    sequence: RequestSequence,
    committed: Mutex<Option<String>>,
    state: watch::Sender<ResolutionState>,
    commits: watch::Sender<Commit>,
}

impl<G: Geocoder> Shared<G> {
    /// Make `raw` the committed location. An unchanged name is skipped
    /// unless `force` is set.
    fn commit(self: &Arc<Self>, raw: &str, force: bool) {
        let name = raw.trim().to_string();

        let mut committed = self.committed.lock();
        if !force && committed.as_deref() == Some(name.as_str()) {
            debug!("Location '{}' unchanged, not re-resolving", name);
            return;
        }
        *committed = Some(name.clone());
        self.commits.send_modify(|commit| {
            commit.generation += 1;
            commit.name = name.clone();
        });

        if name.is_empty() {
            self.sequence
                .begin(|| self.state.send_replace(ResolutionState::Idle));
            debug!("Blank location committed; cleared coordinates");
            return;
        }

        let (ticket, _) = self.sequence.begin(|| {
            self.state
                .send_replace(ResolutionState::Pending { name: name.clone() })
        });
        drop(committed);

        info!("Resolving location '{}'", name);
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.geocoder.geocode(&name).await;
            shared.settle(ticket, name, result);
        });
    }

    fn settle(&self, ticket: Ticket, name: String, result: Result<Coordinates, AppError>) {
        let next = match result {
            Ok(coordinates) => ResolutionState::Resolved {
                name: name.clone(),
                coordinates,
            },
            Err(e) => ResolutionState::Failed {
                name: name.clone(),
                error: failure_message(&e),
            },
        };

        match self.sequence.complete(ticket, || self.state.send_replace(next)) {
            Some(_) => {
                if let Some(error) = self.state.borrow().error() {
                    warn!("Could not resolve '{}': {}", name, error);
                }
            }
            None => debug!("Discarding stale resolution for '{}'", name),
        }
    }
}

/// Location input with debounced or submit-driven resolution.
///
/// Spawns onto the current Tokio runtime; must be used within one.
pub struct LocationResolver<G: Geocoder> {
    shared: Arc<Shared<G>>,
    mode: CommitMode,
    debounce: Duration,
    input: String,
    pending_commit: Option<CancellationToken>,
}

impl<G: Geocoder> LocationResolver<G> {
    pub fn new(geocoder: G, mode: CommitMode, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ResolutionState::Idle);
        let (commits, _) = watch::channel(Commit::default());
        Self {
            shared: Arc::new(Shared {
                geocoder,
                sequence: RequestSequence::new(),
                committed: Mutex::new(None),
                state,
                commits,
            }),
            mode,
            debounce,
            input: String::new(),
            pending_commit: None,
        }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    /// Current, possibly uncommitted, input text.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The last committed name, trimmed.
    pub fn committed(&self) -> Option<String> {
        self.shared.committed.lock().clone()
    }

    pub fn state(&self) -> ResolutionState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.shared.state.subscribe()
    }

    /// Accepted commits, including resubmissions of an unchanged name.
    pub fn subscribe_commits(&self) -> watch::Receiver<Commit> {
        self.shared.commits.subscribe()
    }

    /// Generation of the latest commit; 0 before the first one.
    pub fn commit_generation(&self) -> u64 {
        self.shared.commits.borrow().generation
    }

    /// Record a keystroke. In debounce mode this restarts the quiet timer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        if self.mode == CommitMode::Debounce {
            self.restart_timer();
        }
    }

    /// Commit the current input now, re-resolving even if unchanged.
    pub fn submit(&mut self) {
        self.cancel_timer();
        self.shared.commit(&self.input, true);
    }

    /// Commit now if a debounce timer is still waiting.
    pub fn flush(&mut self) {
        if let Some(token) = self.pending_commit.take() {
            token.cancel();
            self.shared.commit(&self.input, false);
        }
    }

    /// Set the input, commit it immediately and wait for the outcome.
    pub async fn resolve_now(&mut self, text: impl Into<String>) -> ResolutionState {
        let mut rx = self.subscribe();
        self.input = text.into();
        self.submit();

        let outcome = rx.wait_for(|state| !state.is_pending()).await;
        match outcome {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    fn restart_timer(&mut self) {
        self.cancel_timer();

        let token = CancellationToken::new();
        self.pending_commit = Some(token.clone());

        let shared = Arc::clone(&self.shared);
        let value = self.input.clone();
        let delay = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => shared.commit(&value, false),
            }
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.pending_commit.take() {
            token.cancel();
        }
    }
}

impl<G: Geocoder> Drop for LocationResolver<G> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
