use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Source tag attached to every saved reading.
pub const API_SOURCE: &str = "Open-Meteo";

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Guess a representative WMO code from a free-text condition.
///
/// The daily endpoint only returns descriptions, so forecast rows recover a
/// code from keywords. Order matters: "partly cloudy" hits "cloudy" first.
pub fn wmo_code_from_description(description: &str) -> i32 {
    let desc = description.to_lowercase();
    if desc.contains("rain") || desc.contains("shower") {
        61
    } else if desc.contains("snow") {
        71
    } else if desc.contains("fog") || desc.contains("mist") {
        45
    } else if desc.contains("overcast") || desc.contains("cloudy") {
        3
    } else if desc.contains("clear") || desc.contains("sunny") {
        0
    } else if desc.contains("partly") {
        2
    } else {
        1
    }
}

/// Resolved geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Response of `GET /weather/current`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: f64,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    #[serde(default)]
    pub pressure_msl: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub is_day: Option<f64>,
    /// Arrives as a float (e.g. `3.0`)
    #[serde(default)]
    pub weather_code: Option<f64>,
    #[serde(default)]
    pub weather_condition: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl CurrentConditions {
    pub fn condition(&self) -> WeatherCondition {
        self.weather_code
            .map(|code| WeatherCondition::from_wmo_code(code.round() as i32))
            .unwrap_or_default()
    }

    /// Condition text as reported by the API, falling back to the WMO category.
    pub fn condition_text(&self) -> String {
        self.weather_condition
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.condition().description().to_string())
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

/// Response of `GET /weather/daily`: parallel arrays, one slot per day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastResponse {
    #[serde(default)]
    pub daily_time: Option<Vec<String>>,
    #[serde(default)]
    pub daily_conditions: Vec<Option<String>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature_max: Vec<Option<f64>>,
    #[serde(default)]
    pub sunshine_duration: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// One normalized row of the daily forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    /// Timestamp exactly as returned by the API
    pub date: String,
    pub description: String,
    pub weather_code: i32,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub apparent_temperature_max: Option<f64>,
    pub sunshine_duration: Option<f64>,
    pub cloud_cover_mean: Option<f64>,
    pub relative_humidity_mean: Option<f64>,
    pub wind_speed_mean: Option<f64>,
}

impl DayForecast {
    /// Calendar day of this row, if the timestamp starts with `YYYY-MM-DD`.
    pub fn day(&self) -> Option<NaiveDate> {
        let prefix = self.date.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }

    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.weather_code)
    }
}

/// Location record returned by `GET /geodata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude", alias = "lon")]
    pub long: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Body of `POST /weather/create`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewWeatherRecord {
    pub temp: f64,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub condition: String,
    pub triggered_user: String,
    pub api_source: String,
    pub loc_id: i64,
    pub date: DateTime<Utc>,
}

impl NewWeatherRecord {
    /// Build the save payload for a reading taken now.
    pub fn from_conditions(
        conditions: &CurrentConditions,
        user: &str,
        loc_id: i64,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            temp: conditions.temperature_2m,
            humidity: conditions.relative_humidity_2m,
            wind_speed: conditions.wind_speed_10m,
            condition: conditions.condition_text(),
            triggered_user: user.to_string(),
            api_source: API_SOURCE.to_string(),
            loc_id,
            date: taken_at,
        }
    }
}

/// Stored reading returned by `GET /weather/user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: i64,
    #[serde(default)]
    pub loc_id: Option<i64>,
    pub temp: f64,
    #[serde(default, alias = "hum")]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub triggered_user: Option<String>,
    #[serde(default)]
    pub api_source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
