//! Daily forecast for the committed location.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use skyboard_weather::{
    wmo_code_from_description, DailyForecastResponse, DayForecast, WeatherApiClient,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::sequence::RequestSequence;
use crate::view::ViewState;

/// Inclusive date window covering `days` days from `today`.
pub fn forecast_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = u64::from(days.max(1) - 1);
    let end = today.checked_add_days(Days::new(span)).unwrap_or(today);
    (today, end)
}

fn slot(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Zip the parallel daily arrays into at most `days` rows.
///
/// Row count follows `daily_time`; other arrays may be shorter and leave
/// their fields unset.
pub fn normalize(response: &DailyForecastResponse, days: usize) -> Vec<DayForecast> {
    let Some(times) = response.daily_time.as_ref() else {
        return Vec::new();
    };

    times
        .iter()
        .take(days)
        .enumerate()
        .map(|(i, date)| {
            let description = response
                .daily_conditions
                .get(i)
                .cloned()
                .flatten()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string());

            DayForecast {
                date: date.clone(),
                weather_code: wmo_code_from_description(&description),
                description,
                temperature_max: slot(&response.temperature_2m_max, i),
                temperature_min: slot(&response.temperature_2m_min, i),
                apparent_temperature_max: slot(&response.apparent_temperature_max, i),
                sunshine_duration: slot(&response.sunshine_duration, i),
                cloud_cover_mean: slot(&response.cloud_cover_mean, i),
                relative_humidity_mean: slot(&response.relative_humidity_2m_mean, i),
                wind_speed_mean: slot(&response.wind_speed_10m_mean, i),
            }
        })
        .collect()
}

/// Daily forecast view. Clones share state.
#[derive(Debug, Clone)]
pub struct DailyForecastView {
    client: WeatherApiClient,
    days: u32,
    state: Arc<watch::Sender<ViewState<Vec<DayForecast>>>>,
    sequence: RequestSequence,
}

impl DailyForecastView {
    pub fn new(client: WeatherApiClient, days: u32) -> Self {
        let (state, _) = watch::channel(ViewState::Empty);
        Self {
            client,
            days: days.max(1),
            state: Arc::new(state),
            sequence: RequestSequence::new(),
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn state(&self) -> ViewState<Vec<DayForecast>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<Vec<DayForecast>>> {
        self.state.subscribe()
    }

    /// Fetch the forecast starting today (UTC).
    pub async fn set_location(&self, name: &str) -> ViewState<Vec<DayForecast>> {
        self.set_location_from(name, Utc::now().date_naive()).await
    }

    /// Fetch the forecast window starting at `today`.
    pub async fn set_location_from(
        &self,
        name: &str,
        today: NaiveDate,
    ) -> ViewState<Vec<DayForecast>> {
        let name = name.trim().to_string();

        let (ticket, _) = self.sequence.begin(|| {
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

        let (start, end) = forecast_window(today, self.days);
        let next = match self.client.daily_forecast(&name, start, end).await {
            Ok(response) => ViewState::Ready(normalize(&response, self.days as usize)),
            Err(e) => {
                warn!("Daily forecast for '{}' failed: {}", name, e);
                ViewState::Failed(e.to_string())
            }
        };

        if self
            .sequence
            .complete(ticket, || self.state.send_replace(next.clone()))
            .is_none()
        {
            debug!("Discarding stale forecast for '{}'", name);
        }
        next
    }
}
