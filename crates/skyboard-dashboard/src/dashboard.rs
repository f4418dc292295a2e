//! Wires the views together around one location input.

use std::sync::Arc;

use skyboard_core::{AppError, Config};
use skyboard_weather::WeatherApiClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::current::CurrentWeatherView;
use crate::export::Exporter;
use crate::forecast::DailyForecastView;
use crate::history::UserHistory;
use crate::resolver::LocationResolver;
use crate::username::UserIdentity;

/// All dashboard views, sharing one API client.
pub struct Dashboard {
    client: WeatherApiClient,
    pub resolver: LocationResolver<WeatherApiClient>,
    pub current: CurrentWeatherView,
    pub forecast: DailyForecastView,
    pub exporter: Exporter,
    pub identity: UserIdentity,
    /// Latest commit generation whose view loads finished
    views_loaded: Option<watch::Receiver<u64>>,
}

impl Dashboard {
    pub fn new(client: WeatherApiClient, config: &Config) -> Self {
        let dashboard = &config.dashboard;
        Self {
            resolver: LocationResolver::new(
                client.clone(),
                dashboard.commit_mode,
                dashboard.debounce(),
            ),
            current: CurrentWeatherView::new(client.clone(), dashboard.status_clear_delay()),
            forecast: DailyForecastView::new(client.clone(), dashboard.forecast_days),
            exporter: Exporter::new(client.clone(), dashboard.status_clear_delay()),
            identity: UserIdentity::new(config.user.name.clone()),
            views_loaded: None,
            client,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = WeatherApiClient::from_config(&config.api)?;
        Ok(Self::new(client, config))
    }

    pub fn client(&self) -> &WeatherApiClient {
        &self.client
    }

    /// Fresh history view for the current user.
    pub fn history(&self) -> UserHistory {
        UserHistory::new(self.client.clone())
    }

    /// Reload the weather views on every commit, including a resubmission
    /// of the same name. A commit made before this call is loaded at once.
    pub fn follow_commits(&mut self) -> JoinHandle<()> {
        let mut commits = self.resolver.subscribe_commits();
        let initial = commits.borrow_and_update().clone();
        let (loaded_tx, loaded_rx) = watch::channel(0u64);
        self.views_loaded = Some(loaded_rx);

        let current = self.current.clone();
        let forecast = self.forecast.clone();

        tokio::spawn(async move {
            let loaded_tx = Arc::new(loaded_tx);
            let mut next = (initial.generation > 0).then_some(initial);
            let mut in_flight: Option<JoinHandle<()>> = None;

            loop {
                if let Some(commit) = next.take() {
                    debug!(
                        "Loading views for commit {} ('{}')",
                        commit.generation, commit.name
                    );
                    // A superseded load must not start after the new one
                    if let Some(task) = in_flight.take() {
                        task.abort();
                    }
                    let current = current.clone();
                    let forecast = forecast.clone();
                    let loaded_tx = Arc::clone(&loaded_tx);
                    in_flight = Some(tokio::spawn(async move {
                        tokio::join!(
                            current.set_location(&commit.name),
                            forecast.set_location(&commit.name)
                        );
                        loaded_tx.send_if_modified(|loaded| {
                            if commit.generation <= *loaded {
                                return false;
                            }
                            *loaded = commit.generation;
                            true
                        });
                    }));
                }

                if commits.changed().await.is_err() {
                    break;
                }
                next = Some(commits.borrow_and_update().clone());
            }
        })
    }

    /// Commit any input still waiting on the debounce timer, then wait until
    /// the resolution and, when following commits, the view loads finish.
    pub async fn settle(&mut self) {
        self.resolver.flush();
        let generation = self.resolver.commit_generation();

        let mut resolution = self.resolver.subscribe();
        if resolution.wait_for(|s| !s.is_pending()).await.is_err() {
            return;
        }

        if let Some(loaded) = &self.views_loaded {
            let mut loaded = loaded.clone();
            // Err means the follower stopped; nothing more will load
            let _ = loaded.wait_for(|done| *done >= generation).await;
        }
    }
}
