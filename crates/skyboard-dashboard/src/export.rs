//! Export downloads with a shared progress indicator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use skyboard_core::AppError;
use skyboard_weather::{ExportFile, ExportFilters, ExportFormat, WeatherApiClient};
use tracing::{info, warn};

use crate::status::StatusTracker;

/// Runs exports one at a time and tracks their outcome.
#[derive(Debug, Clone)]
pub struct Exporter {
    client: WeatherApiClient,
    status: StatusTracker,
}

impl Exporter {
    pub fn new(client: WeatherApiClient, status_clear: Duration) -> Self {
        Self {
            client,
            status: StatusTracker::new(status_clear),
        }
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Download an export. Fails with [`AppError::Busy`] while another runs.
    pub async fn export(
        &self,
        format: ExportFormat,
        filters: &ExportFilters,
    ) -> Result<ExportFile, AppError> {
        if !self.status.try_begin() {
            return Err(AppError::Busy("export"));
        }

        let result = self.download(format, filters).await;
        self.status.finish(result.is_ok());
        result
    }

    /// Download an export and write it into `dir` under its suggested name.
    ///
    /// The status reports success only once the file is on disk.
    pub async fn export_to_dir(
        &self,
        format: ExportFormat,
        filters: &ExportFilters,
        dir: &Path,
    ) -> Result<PathBuf, AppError> {
        if !self.status.try_begin() {
            return Err(AppError::Busy("export"));
        }

        let result = async {
            let file = self.download(format, filters).await?;
            let target = dir.join(safe_file_name(&file.filename, format));
            tokio::fs::write(&target, &file.bytes).await?;
            Ok::<_, AppError>(target)
        }
        .await;
        self.status.finish(result.is_ok());
        if let Err(e) = &result {
            warn!("Export {} not written to {}: {}", format, dir.display(), e);
        }
        result
    }

    async fn download(
        &self,
        format: ExportFormat,
        filters: &ExportFilters,
    ) -> Result<ExportFile, AppError> {
        let result = self.client.export(format, filters).await;
        match &result {
            Ok(file) => info!(
                "Exported {} ({} bytes) as {}",
                format,
                file.bytes.len(),
                file.filename
            ),
            Err(e) => warn!("Export {} failed: {}", format, e),
        }
        result
    }
}

/// Final path component of a server-suggested name.
fn safe_file_name(suggested: &str, format: ExportFormat) -> String {
    Path::new(suggested)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("weather_export.{}", format.extension()))
}
