//! Export request shape and download naming.
//!
//! Encoding happens server-side; the client only picks a format, attaches
//! the non-empty filters and names the downloaded file.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Server-side export flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
    /// Locations only, as JSON
    LocationsJson,
    /// Weather readings only, as JSON
    WeatherJson,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Xml,
        ExportFormat::LocationsJson,
        ExportFormat::WeatherJson,
    ];

    /// Path below `/export/`
    pub fn path(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::LocationsJson => "locations/json",
            Self::WeatherJson => "weather/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xml => "xml",
            Self::Json | Self::LocationsJson | Self::WeatherJson => "json",
        }
    }

    /// Whether the server honours location/date filters for this format.
    pub fn accepts_filters(&self) -> bool {
        !matches!(self, Self::LocationsJson)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "locations" | "locations/json" => Ok(Self::LocationsJson),
            "weather" | "weather/json" => Ok(Self::WeatherJson),
            other => Err(format!(
                "unknown export format '{}' (expected json, csv, xml, locations or weather)",
                other
            )),
        }
    }
}

/// Optional export filters. Empty fields are left off the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilters {
    pub location: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
}

impl ExportFilters {
    /// Query parameters to send; a parameter is present iff its filter is non-empty.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("location", self.location.trim()),
            ("start_date", self.start_date.trim()),
            ("end_date", self.end_date.trim()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }
}

/// A downloaded export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// Pattern is a literal; it cannot fail to compile.
#[allow(clippy::unwrap_used)]
fn disposition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"filename="?([^"]*)"?"#).unwrap())
}

/// Extract the file name from a `Content-Disposition` header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let captures = disposition_regex().captures(header)?;
    let name = captures.get(1)?.as_str().trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Name used when the server does not send one.
pub fn default_export_filename(format: ExportFormat, today: NaiveDate) -> String {
    format!(
        "weather_export_{}.{}",
        today.format("%Y-%m-%d"),
        format.extension()
    )
}
