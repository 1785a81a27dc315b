use super::export::ExportFormat;
use crate::api::ApiClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unsupported frequency: {}", other)),
        }
    }
}

/// Body of `POST /api/dashboards/{id}/schedule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScheduleRequest {
    pub frequency: Frequency,
    #[validate(email)]
    pub email: String,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfirmation {
    pub id: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

impl ScheduleRequest {
    pub fn validate(&self) -> Vec<String> {
        if self.email.trim().is_empty() {
            return vec!["Email is required".to_string()];
        }
        match Validate::validate(self) {
            Ok(()) => Vec::new(),
            Err(_) => vec![format!("\"{}\" is not a valid email address", self.email)],
        }
    }
}

pub async fn schedule_report(
    api: &ApiClient,
    dashboard_id: &str,
    request: &ScheduleRequest,
) -> anyhow::Result<ScheduleConfirmation> {
    let errors = request.validate();
    if !errors.is_empty() {
        anyhow::bail!(errors.join("; "));
    }
    let path = ["api", "dashboards", dashboard_id, "schedule"];
    let confirmation: ScheduleConfirmation = api.post(&path, request).await?;
    info!(dashboard_id, frequency = ?request.frequency, "report scheduled");
    Ok(confirmation)
}
