//! Weather API access for Skyboard
//!
//! Typed client for the dashboard backend (current conditions, daily
//! forecast, geodata, saved readings, exports) and the wire types it speaks.

pub mod client;
pub mod export;
pub mod types;

pub use client::{envelope_error, WeatherApiClient};
pub use export::{ExportFile, ExportFilters, ExportFormat};
pub use types::*;
