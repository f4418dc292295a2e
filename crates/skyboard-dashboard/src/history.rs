//! A user's saved readings, with location names looked up lazily.

use std::collections::HashMap;

use skyboard_core::AppError;
use skyboard_weather::{WeatherApiClient, WeatherRecord};
use tracing::{debug, info, instrument, warn};

/// Shown when a record's location cannot be looked up
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

fn history_error(err: &AppError) -> String {
    match err {
        AppError::Application(detail) => detail.clone(),
        other => format!("Failed to fetch history: {}", other),
    }
}

fn delete_error(err: &AppError) -> String {
    match err {
        AppError::Application(detail) => detail.clone(),
        other => format!("Failed to delete record: {}", other),
    }
}

/// Saved readings for one user
#[derive(Debug)]
pub struct UserHistory {
    client: WeatherApiClient,
    user: String,
    records: Vec<WeatherRecord>,
    location_names: HashMap<i64, String>,
    error: Option<String>,
}

impl UserHistory {
    pub fn new(client: WeatherApiClient) -> Self {
        Self {
            client,
            user: String::new(),
            records: Vec::new(),
            location_names: HashMap::new(),
            error: None,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Records in server order.
    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    /// Message for the last failed load or delete.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the list with `user`'s saved readings.
    #[instrument(skip(self))]
    pub async fn load(&mut self, user: &str) -> Result<&[WeatherRecord], AppError> {
        self.user = user.trim().to_string();
        self.error = None;

        match self.client.user_records(&self.user).await {
            Ok(records) => {
                info!("Loaded {} saved readings for {}", records.len(), self.user);
                self.records = records;
                Ok(&self.records)
            }
            Err(e) => {
                warn!("Loading history for {} failed: {}", self.user, e);
                self.records.clear();
                self.error = Some(history_error(&e));
                Err(e)
            }
        }
    }

    /// Cached location name, if already looked up.
    pub fn cached_location_name(&self, loc_id: i64) -> Option<&str> {
        self.location_names.get(&loc_id).map(String::as_str)
    }

    /// Name for `loc_id`, fetched once and cached. Failures are not cached.
    pub async fn location_name(&mut self, loc_id: i64) -> String {
        if let Some(name) = self.location_names.get(&loc_id) {
            return name.clone();
        }

        match self.client.geodata_by_id(loc_id).await {
            Ok(record) => {
                let name = record
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
                self.location_names.insert(loc_id, name.clone());
                name
            }
            Err(e) => {
                debug!("Location {} lookup failed: {}", loc_id, e);
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    /// Look up every location referenced by the loaded records.
    pub async fn resolve_location_names(&mut self) {
        let mut ids: Vec<i64> = self.records.iter().filter_map(|r| r.loc_id).collect();
        ids.sort_unstable();
        ids.dedup();

        for id in ids {
            self.location_name(id).await;
        }
    }

    /// Display name for a record's location without fetching.
    pub fn display_location(&self, record: &WeatherRecord) -> &str {
        record
            .loc_id
            .and_then(|id| self.cached_location_name(id))
            .unwrap_or(UNKNOWN_LOCATION)
    }

    /// Delete a saved reading and drop it from the list.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, record_id: i64) -> Result<(), AppError> {
        match self.client.delete_weather(record_id).await {
            Ok(()) => {
                self.records.retain(|r| r.id != record_id);
                self.error = None;
                info!("Deleted saved reading {}", record_id);
                Ok(())
            }
            Err(e) => {
                warn!("Deleting saved reading {} failed: {}", record_id, e);
                self.error = Some(delete_error(&e));
                Err(e)
            }
        }
    }
}
