//! Saved visual queries and the load dialog.

use crate::api::{ApiClient, ApiResult};
use crate::builder::{ConfigSummary, VisualQueryConfig};
use crate::notify::Notifications;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const QUERIES_PATH: &[&str] = &["api", "visual-queries"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVisualQuery {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub config: VisualQueryConfig,
    pub updated_at: DateTime<Utc>,
}

impl SavedVisualQuery {
    /// Case-insensitive substring match on name, description or any tag.
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
            || self
                .tags
                .iter()
                .flatten()
                .any(|t| t.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Deserialize)]
struct QueryListResponse {
    #[serde(default)]
    queries: Vec<SavedVisualQuery>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveQueryRequest {
    pub workspace_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub config: VisualQueryConfig,
}

#[derive(Debug, Deserialize)]
struct SaveQueryResponse {
    query: SavedVisualQuery,
}

pub async fn list_queries(api: &ApiClient, workspace_id: &str) -> ApiResult<Vec<SavedVisualQuery>> {
    let resp: QueryListResponse = api
        .get_with_query(QUERIES_PATH, &[("workspace_id", workspace_id)])
        .await?;
    Ok(resp.queries)
}

/// Persist a configuration under a name. Blank names are rejected before
/// anything is sent.
pub async fn save_query(api: &ApiClient, request: &SaveQueryRequest) -> anyhow::Result<SavedVisualQuery> {
    if request.name.trim().is_empty() {
        anyhow::bail!("Query name is required");
    }
    let resp: SaveQueryResponse = api.post(QUERIES_PATH, request).await?;
    info!(id = %resp.query.id, name = %resp.query.name, "visual query saved");
    Ok(resp.query)
}

pub async fn delete_query(api: &ApiClient, id: &str) -> ApiResult<()> {
    api.delete(&["api", "visual-queries", id]).await
}

/// State of the "Load query" dialog.
///
/// Every `open` re-fetches; nothing is cached between openings.
#[derive(Debug, Default)]
pub struct LoadQueryDialog {
    open: bool,
    queries: Vec<SavedVisualQuery>,
    search: String,
    expanded: Option<String>,
    notifications: Notifications,
}

impl LoadQueryDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub async fn open(&mut self, api: &ApiClient, workspace_id: &str) {
        let result = list_queries(api, workspace_id).await;
        self.open_with(result);
    }

    /// Open with an already-fetched result.
    pub fn open_with(&mut self, result: ApiResult<Vec<SavedVisualQuery>>) {
        self.open = true;
        self.search.clear();
        self.expanded = None;
        match result {
            Ok(queries) => self.queries = queries,
            Err(e) => {
                warn!(error = %e, "failed to load saved queries");
                self.queries.clear();
                self.notifications
                    .error(format!("Failed to load saved queries: {}", e.user_message()));
            }
        }
    }

    pub fn close(&mut self) {
        self.open = false;
        self.expanded = None;
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
    }

    pub fn all(&self) -> &[SavedVisualQuery] {
        &self.queries
    }

    /// Queries matching the search text; everything when it is blank.
    pub fn filtered(&self) -> Vec<&SavedVisualQuery> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return self.queries.iter().collect();
        }
        self.queries.iter().filter(|q| q.matches(&needle)).collect()
    }

    /// Toggle the details panel for a row.
    pub fn toggle_details(&mut self, id: &str) {
        if self.expanded.as_deref() == Some(id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id.to_string());
        }
    }

    pub fn expanded(&self) -> Option<(&SavedVisualQuery, ConfigSummary)> {
        let id = self.expanded.as_deref()?;
        self.queries
            .iter()
            .find(|q| q.id == id)
            .map(|q| (q, q.config.summary()))
    }

    /// Hand the query to the caller and close the dialog.
    pub fn load(&mut self, id: &str) -> Option<SavedVisualQuery> {
        let query = self.queries.iter().find(|q| q.id == id).cloned()?;
        self.close();
        Some(query)
    }

    pub fn drain_notifications(&mut self) -> Vec<crate::notify::Notification> {
        self.notifications.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use reqwest::StatusCode;

    fn query(id: &str, name: &str, description: Option<&str>, tags: &[&str]) -> SavedVisualQuery {
        SavedVisualQuery {
            id: id.into(),
            name: name.into(),
            description: description.map(str::to_string),
            tags: if tags.is_empty() {
                None
            } else {
                Some(tags.iter().map(|t| t.to_string()).collect())
            },
            config: VisualQueryConfig {
                tables: vec!["orders".into(), "customers".into()],
                ..Default::default()
            },
            updated_at: Utc::now(),
        }
    }

    fn dialog() -> LoadQueryDialog {
        let mut d = LoadQueryDialog::new();
        d.open_with(Ok(vec![
            query("q1", "Monthly Revenue", Some("Revenue by month"), &["finance"]),
            query("q2", "Churn", None, &["Retention", "KPI"]),
            query("q3", "Top customers", Some("Ranked by lifetime VALUE"), &[]),
        ]));
        d
    }

    fn ids(list: Vec<&SavedVisualQuery>) -> Vec<String> {
        list.into_iter().map(|q| q.id.clone()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let mut d = dialog();

        d.set_search("REVENUE");
        assert_eq!(ids(d.filtered()), vec!["q1"]);

        d.set_search("value");
        assert_eq!(ids(d.filtered()), vec!["q3"]);

        d.set_search("kpi");
        assert_eq!(ids(d.filtered()), vec!["q2"]);

        d.set_search("nothing-matches");
        assert!(d.filtered().is_empty());
    }

    #[test]
    fn test_clearing_search_restores_list() {
        let mut d = dialog();
        d.set_search("churn");
        assert_eq!(d.filtered().len(), 1);
        d.set_search("");
        assert_eq!(ids(d.filtered()), vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_toggle_details() {
        let mut d = dialog();
        d.toggle_details("q2");
        let (q, summary) = d.expanded().unwrap();
        assert_eq!(q.id, "q2");
        assert_eq!(summary.tables, 2);

        d.toggle_details("q2");
        assert!(d.expanded().is_none());
    }

    #[test]
    fn test_load_closes_dialog() {
        let mut d = dialog();
        let loaded = d.load("q3").unwrap();
        assert_eq!(loaded.name, "Top customers");
        assert!(!d.is_open());
        assert!(d.load("missing").is_none());
    }

    #[test]
    fn test_failed_fetch_stays_open_with_empty_list() {
        let mut d = LoadQueryDialog::new();
        d.open_with(Err(ApiError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        }));
        assert!(d.is_open());
        assert!(d.all().is_empty());
        assert_eq!(d.drain_notifications().len(), 1);
    }
}
