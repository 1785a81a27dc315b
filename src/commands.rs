use crate::ai::{Assistant, SchemaContext};
use crate::api::ApiClient;
use crate::builder::{JoinSuggestion, JoinSuggestions, SqlPreview, VisualQueryConfig};
use crate::charts::{render_json, ChartKind, ChartView};
use crate::config::Settings;
use crate::connections::{self, Connection};
use crate::dashboard::{
    schedule_report, start_export, ExportFormat, ExportOutcome, ExportPoller, ScheduleConfirmation,
    ScheduleRequest,
};
use crate::notify::Notifications;
use crate::saved::{LoadQueryDialog, SavedVisualQuery};
use crate::schema::{SchemaProvider, TableSchema};
use crate::storage::{AiPromptEntry, LocalDb, SqlHistoryEntry};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tracing::{info, warn};

/// Everything a command needs: settings, the backend client and the local
/// store.
pub struct AppState {
    pub settings: Settings,
    pub api: ApiClient,
    pub local_db: LocalDb,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let api = ApiClient::new(&settings.api).context("Failed to build API client")?;
        let path = settings.storage.resolved_path();
        let local_db = LocalDb::open(&path)
            .with_context(|| format!("Failed to open local store at {}", path.display()))?;
        Ok(Self {
            settings,
            api,
            local_db,
        })
    }

    pub fn with_parts(settings: Settings, api: ApiClient, local_db: LocalDb) -> Self {
        Self {
            settings,
            api,
            local_db,
        }
    }

    fn workspace_id(&self) -> Result<&str> {
        let id = self.settings.workspace.id.trim();
        if id.is_empty() {
            bail!("No workspace configured. Set [workspace] id or INSIGHTDECK_WORKSPACE.");
        }
        Ok(id)
    }
}

pub async fn list_connections(state: &AppState) -> Result<Vec<Connection>> {
    connections::list_connections(&state.api)
        .await
        .context("Failed to list connections")
}

pub async fn get_schema(state: &AppState, connection_id: &str) -> Result<Vec<TableSchema>> {
    let mut provider = SchemaProvider::new();
    provider
        .refresh(&state.api, connection_id)
        .await
        .with_context(|| format!("Failed to load schema for connection {}", connection_id))?;
    if let Err(e) = state.local_db.touch_connection(connection_id, connection_id).await {
        warn!(error = %e, "failed to record recent connection");
    }
    Ok(provider.tables().to_vec())
}

#[derive(Debug, Serialize)]
pub struct PreviewOutput {
    pub sql: String,
    pub complexity: Option<&'static str>,
    pub error: Option<String>,
}

impl PreviewOutput {
    /// Err when the backend could not generate SQL. The output is still
    /// worth printing first since `sql` carries the error comment.
    pub fn ensure_generated(&self) -> Result<()> {
        match &self.error {
            Some(error) => bail!("SQL generation failed: {}", error),
            None => Ok(()),
        }
    }
}

/// Generate SQL for a builder configuration. Successful previews are kept
/// in the local history.
pub async fn preview_sql(
    state: &AppState,
    connection_id: &str,
    config: &VisualQueryConfig,
) -> Result<PreviewOutput> {
    let mut preview = SqlPreview::new();
    let fetched = preview.refresh(&state.api, connection_id, config).await;
    let complexity = preview.complexity().map(|c| c.label());

    if fetched && preview.error().is_none() {
        state
            .local_db
            .add_sql_history(connection_id, preview.sql(), complexity)
            .await
            .context("Failed to record SQL history")?;
    }

    Ok(PreviewOutput {
        sql: preview.sql().to_string(),
        complexity,
        error: preview.error().map(str::to_string),
    })
}

pub async fn suggest_joins(
    state: &AppState,
    connection_id: &str,
    tables: &[String],
) -> Result<Vec<JoinSuggestion>> {
    let set: BTreeSet<String> = tables.iter().cloned().collect();
    if set.len() < 2 {
        bail!(
            "Join suggestions need at least two distinct tables, got {}",
            set.len()
        );
    }
    let mut suggestions = JoinSuggestions::new();
    let mut notifications = Notifications::default();
    suggestions
        .refresh(&state.api, connection_id, &set, &mut notifications)
        .await;
    if let Some(failure) = notifications.drain().into_iter().next() {
        bail!(failure.message);
    }
    Ok(suggestions.suggestions().to_vec())
}

/// Saved queries for the configured workspace, filtered like the load
/// dialog filters them.
pub async fn saved_queries(state: &AppState, search: Option<&str>) -> Result<Vec<SavedVisualQuery>> {
    let workspace_id = state.workspace_id()?;
    let mut dialog = LoadQueryDialog::new();
    dialog.open(&state.api, workspace_id).await;
    if let Some(failure) = dialog.drain_notifications().into_iter().next() {
        bail!(failure.message);
    }
    if let Some(search) = search {
        dialog.set_search(search);
    }
    Ok(dialog.filtered().into_iter().cloned().collect())
}

pub fn validate_chart(kind: ChartKind, data: Value) -> ChartView {
    render_json(kind, data)
}

/// Start an export and poll until it settles. Ctrl-C cancels polling.
pub async fn export_dashboard(
    state: &AppState,
    dashboard_id: &str,
    format: ExportFormat,
) -> Result<ExportOutcome> {
    let job_id = start_export(&state.api, dashboard_id, format)
        .await
        .context("Failed to start export")?;

    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
        // keep the sender alive until the poll finishes
        std::future::pending::<()>().await;
    });

    let poller = ExportPoller::from_settings(&state.settings.export);
    let outcome = poller.poll(&state.api, &job_id, &mut cancel_rx).await;
    ctrl_c.abort();
    info!(dashboard_id, ?outcome, "export finished");
    Ok(outcome)
}

pub async fn schedule(
    state: &AppState,
    dashboard_id: &str,
    request: &ScheduleRequest,
) -> Result<ScheduleConfirmation> {
    schedule_report(&state.api, dashboard_id, request).await
}

pub async fn explain(state: &AppState, rows: &[Value], context: &Value) -> Result<Vec<String>> {
    Assistant::new(state.api.clone())
        .explain(rows, context)
        .await
        .context("Failed to explain data")
}

/// Natural language to SQL. The prompt and its result are remembered for
/// later recall.
pub async fn generate_sql(state: &AppState, connection_id: &str, prompt: &str) -> Result<String> {
    if prompt.trim().is_empty() {
        bail!("Prompt is required");
    }
    let tables = get_schema(state, connection_id).await?;
    let context = SchemaContext::from_tables(&tables);
    let sql = Assistant::new(state.api.clone())
        .generate_sql(connection_id, prompt, &context)
        .await
        .context("Failed to generate SQL")?;
    state
        .local_db
        .save_ai_prompt(prompt.trim(), &sql)
        .await
        .context("Failed to record prompt")?;
    Ok(sql)
}

pub async fn sql_history(
    state: &AppState,
    connection_id: Option<&str>,
    limit: i64,
) -> Result<Vec<SqlHistoryEntry>> {
    Ok(state.local_db.get_sql_history(connection_id, limit).await?)
}

pub async fn search_prompts(state: &AppState, search: &str, limit: i64) -> Result<Vec<AiPromptEntry>> {
    Ok(state.local_db.search_ai_prompts(search, limit).await?)
}
