//! Typed client for the weather dashboard API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use skyboard_core::{ApiConfig, AppError, ConfigError, TransportError};

use crate::export::{
    default_export_filename, filename_from_disposition, ExportFile, ExportFilters, ExportFormat,
};
use crate::types::{
    Coordinates, CurrentConditions, DailyForecastResponse, LocationRecord, NewWeatherRecord,
    WeatherRecord,
};

const USER_AGENT: &str = concat!("skyboard/", env!("CARGO_PKG_VERSION"));

/// Returns the `detail` of an error envelope (`{"error": <truthy>, "detail": ...}`).
///
/// The backend flags errors with `true` as well as with status integers
/// such as `404`, so any truthy value counts.
pub fn envelope_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    let flagged = match obj.get("error")? {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    };
    if !flagged {
        return None;
    }

    let detail = match obj.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => "Unknown error".to_string(),
        Some(other) => other.to_string(),
    };
    Some(detail)
}

/// Weather API client
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    base_url: Url,
    client: Arc<Client>,
}

impl WeatherApiClient {
    /// Create a client for `base_url`. `None` disables the transport timeout.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("api.base_url: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| ConfigError::Invalid(format!("endpoint {}: {}", path, e)).into())
    }

    /// Current conditions for a location name.
    #[instrument(skip(self), level = "debug")]
    pub async fn current_weather(&self, name: &str) -> Result<CurrentConditions, AppError> {
        let response = self
            .client
            .get(self.endpoint("weather/current")?)
            .query(&[("name", name)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Resolve a location name to coordinates via the current-conditions endpoint.
    #[instrument(skip(self), level = "debug")]
    pub async fn locate(&self, name: &str) -> Result<Coordinates, AppError> {
        let response = self
            .client
            .get(self.endpoint("weather/current")?)
            .query(&[("name", name)])
            .send()
            .await?;

        let point: LocatedPoint = self.handle_response(response).await?;
        match (point.latitude, point.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
            }),
            _ => Err(TransportError::InvalidResponse(
                "response carries no coordinates".to_string(),
            )
            .into()),
        }
    }

    /// Daily forecast for `[start, end]`, both inclusive.
    #[instrument(skip(self), level = "debug")]
    pub async fn daily_forecast(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyForecastResponse, AppError> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();

        let response = self
            .client
            .get(self.endpoint("weather/daily")?)
            .query(&[
                ("name", name),
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Location record for a name (creates it server-side when new).
    #[instrument(skip(self), level = "debug")]
    pub async fn geodata(&self, name: &str) -> Result<LocationRecord, AppError> {
        let response = self
            .client
            .get(self.endpoint("geodata")?)
            .header(header::CONTENT_TYPE, "application/json")
            .query(&[("name", name)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Location record by id.
    #[instrument(skip(self), level = "debug")]
    pub async fn geodata_by_id(&self, id: i64) -> Result<LocationRecord, AppError> {
        let response = self
            .client
            .get(self.endpoint(&format!("geodata/{}", id))?)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Store a reading. Returns the server's confirmation message, if any.
    #[instrument(skip(self, record), level = "debug", fields(loc_id = record.loc_id))]
    pub async fn create_weather(
        &self,
        record: &NewWeatherRecord,
    ) -> Result<Option<String>, AppError> {
        let response = self
            .client
            .post(self.endpoint("weather/create")?)
            .json(record)
            .send()
            .await?;

        let body: Value = self.handle_response(response).await?;
        Ok(message_of(&body))
    }

    /// Saved readings of one user, in server order.
    #[instrument(skip(self), level = "debug")]
    pub async fn user_records(&self, user: &str) -> Result<Vec<WeatherRecord>, AppError> {
        let response = self
            .client
            .get(self.endpoint("weather/user")?)
            .query(&[("user", user)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Delete a saved reading.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_weather(&self, id: i64) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("weather/{}", id))?)
            .send()
            .await?;

        // Success bodies vary (message object or empty), only the envelope matters
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()).into());
        }
        let bytes = response.bytes().await?;
        if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
            if let Some(detail) = envelope_error(&body) {
                return Err(AppError::Application(detail));
            }
        }
        Ok(())
    }

    /// Download an export. Filters are attached only when non-empty.
    #[instrument(skip(self, format, filters), level = "debug", fields(format = %format))]
    pub async fn export(
        &self,
        format: ExportFormat,
        filters: &ExportFilters,
    ) -> Result<ExportFile, AppError> {
        let mut request = self
            .client
            .get(self.endpoint(&format!("export/{}", format.path()))?);
        let pairs = filters.query_pairs();
        if format.accepts_filters() && !pairs.is_empty() {
            request = request.query(&pairs);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()).into());
        }

        let headers = response.headers().clone();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        // Empty CSV exports come back as a 200 JSON error envelope
        if content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
        {
            if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
                if let Some(detail) = envelope_error(&body) {
                    return Err(AppError::Application(detail));
                }
            }
        }

        let filename = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| default_export_filename(format, Utc::now().date_naive()));

        tracing::debug!("Export {} downloaded: {} bytes as {}", format, bytes.len(), filename);

        Ok(ExportFile {
            filename,
            content_type,
            bytes,
        })
    }

    /// Map a response to `T`, separating transport failures from error envelopes.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} returned status {}", response.url().path(), status);
            return Err(TransportError::Status(status.as_u16()).into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        if let Some(detail) = envelope_error(&body) {
            tracing::debug!("API reported error: {}", detail);
            return Err(AppError::Application(detail));
        }

        serde_json::from_value(body).map_err(|e| {
            TransportError::InvalidResponse(format!("JSON parse error: {}", e)).into()
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct LocatedPoint {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

fn message_of(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
