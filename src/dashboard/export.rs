use crate::api::{ApiClient, ApiResult};
use crate::config::ExportSettings;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Png,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobStatus {
    pub status: JobState,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StartExportRequest {
    format: ExportFormat,
}

#[derive(Debug, Deserialize)]
struct StartExportResponse {
    job_id: String,
}

/// How an export ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportOutcome {
    Completed { download_url: Option<String> },
    Failed { error: String },
    /// Still not terminal after the configured number of status checks.
    TimedOut { attempts: u32 },
    /// The owning dialog was closed.
    Cancelled,
}

pub async fn start_export(api: &ApiClient, dashboard_id: &str, format: ExportFormat) -> ApiResult<String> {
    let path = ["api", "dashboards", dashboard_id, "export"];
    let resp: StartExportResponse = api.post(&path, &StartExportRequest { format }).await?;
    info!(dashboard_id, job_id = %resp.job_id, ?format, "export started");
    Ok(resp.job_id)
}

pub async fn export_status(api: &ApiClient, job_id: &str) -> ApiResult<ExportJobStatus> {
    api.get(&["api", "dashboards", "exports", job_id])
        .await
}

/// Fixed-interval status polling with an attempt cap.
#[derive(Debug, Clone, Copy)]
pub struct ExportPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for ExportPoller {
    fn default() -> Self {
        Self::from_settings(&ExportSettings::default())
    }
}

impl ExportPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self::new(settings.poll_interval(), settings.max_attempts)
    }

    /// Poll `check` every interval until the job is terminal, `cancel`
    /// flips to `true` (or its sender is dropped), or the attempt cap is
    /// reached. A failed status request uses up an attempt and polling
    /// continues.
    pub async fn poll_with<F, Fut>(&self, mut check: F, cancel: &mut watch::Receiver<bool>) -> ExportOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<ExportJobStatus>>,
    {
        for attempt in 1..=self.max_attempts {
            if *cancel.borrow() {
                return ExportOutcome::Cancelled;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return ExportOutcome::Cancelled;
                    }
                }
            }

            match check().await {
                Ok(status) => {
                    debug!(attempt, status = ?status.status, "export status");
                    match status.status {
                        JobState::Completed => {
                            return ExportOutcome::Completed {
                                download_url: status.download_url,
                            }
                        }
                        JobState::Failed => {
                            return ExportOutcome::Failed {
                                error: status.error.unwrap_or_else(|| "Export failed".to_string()),
                            }
                        }
                        JobState::Pending | JobState::Processing => {}
                    }
                }
                Err(e) => warn!(attempt, error = %e, "export status check failed"),
            }
        }

        warn!(attempts = self.max_attempts, "export polling timed out");
        ExportOutcome::TimedOut {
            attempts: self.max_attempts,
        }
    }

    pub async fn poll(&self, api: &ApiClient, job_id: &str, cancel: &mut watch::Receiver<bool>) -> ExportOutcome {
        self.poll_with(|| export_status(api, job_id), cancel).await
    }
}
