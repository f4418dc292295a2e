//! Current conditions for the committed location, plus saving a reading.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use skyboard_core::{AppError, TransportError};
use skyboard_weather::{CurrentConditions, NewWeatherRecord, WeatherApiClient};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::sequence::RequestSequence;
use crate::status::StatusTracker;
use crate::view::ViewState;

/// Current weather view. Clones share state.
#[derive(Debug, Clone)]
pub struct CurrentWeatherView {
    client: WeatherApiClient,
    state: Arc<watch::Sender<ViewState<CurrentConditions>>>,
    location: Arc<Mutex<String>>,
    sequence: RequestSequence,
    save_status: StatusTracker,
}

impl CurrentWeatherView {
    pub fn new(client: WeatherApiClient, status_clear: Duration) -> Self {
        let (state, _) = watch::channel(ViewState::Empty);
        Self {
            client,
            state: Arc::new(state),
            location: Arc::new(Mutex::new(String::new())),
            sequence: RequestSequence::new(),
            save_status: StatusTracker::new(status_clear),
        }
    }

    pub fn state(&self) -> ViewState<CurrentConditions> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<CurrentConditions>> {
        self.state.subscribe()
    }

    /// Location the shown conditions belong to.
    pub fn location(&self) -> String {
        self.location.lock().clone()
    }

    pub fn save_status(&self) -> &StatusTracker {
        &self.save_status
    }

    /// Fetch conditions for `name`. A blank name clears the view.
    ///
    /// Returns the state this request produced, which is only published if
    /// no newer request has started since.
    pub async fn set_location(&self, name: &str) -> ViewState<CurrentConditions> {
        let name = name.trim().to_string();

        let (ticket, _) = self.sequence.begin(|| {
            *self.location.lock() = name.clone();
            let next = if name.is_empty() {
                ViewState::Empty
            } else {
                ViewState::Loading
            };
            self.state.send_replace(next);
        });
        if name.is_empty() {
            return ViewState::Empty;
        }

        let next = match self.client.current_weather(&name).await {
            Ok(conditions) => ViewState::Ready(conditions),
            Err(e) => {
                warn!("Current weather for '{}' failed: {}", name, e);
                ViewState::Failed(e.to_string())
            }
        };

        if self
            .sequence
            .complete(ticket, || self.state.send_replace(next.clone()))
            .is_none()
        {
            debug!("Discarding stale current weather for '{}'", name);
        }
        next
    }

    /// Save the shown reading for `user`.
    ///
    /// Returns `Ok(false)` without touching the network when there is
    /// nothing to save or no user. Fails with [`AppError::Busy`] while an
    /// earlier save is still running.
    pub async fn save(&self, user: &str) -> Result<bool, AppError> {
        let user = user.trim();
        let location = self.location();
        let Some(conditions) = self.state.borrow().data().cloned() else {
            return Ok(false);
        };
        if user.is_empty() || location.is_empty() {
            return Ok(false);
        }

        if !self.save_status.try_begin() {
            return Err(AppError::Busy("save"));
        }

        let result = self.persist(&conditions, &location, user).await;
        self.save_status.finish(result.is_ok());
        match &result {
            Ok(()) => info!("Saved reading for '{}' as {}", location, user),
            Err(e) => warn!("Saving reading for '{}' failed: {}", location, e),
        }
        result.map(|()| true)
    }

    async fn persist(
        &self,
        conditions: &CurrentConditions,
        location: &str,
        user: &str,
    ) -> Result<(), AppError> {
        let record = self.client.geodata(location).await?;
        let loc_id = record.id.ok_or_else(|| {
            TransportError::InvalidResponse(format!("location '{}' has no id", location))
        })?;

        let payload = NewWeatherRecord::from_conditions(conditions, user, loc_id, Utc::now());
        self.client.create_weather(&payload).await?;
        Ok(())
    }
}
