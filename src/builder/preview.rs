use super::config::{Complexity, VisualQueryConfig};
use crate::api::{ApiClient, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const GENERATE_SQL_PATH: &[&str] = &["api", "visual-queries", "generate-sql"];
pub const PLACEHOLDER_SQL: &str = "-- Add tables to the canvas to generate SQL";

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSqlRequest {
    pub connection_id: String,
    pub config: VisualQueryConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateSqlResponse {
    sql: String,
}

/// A generate-sql call that has been started but not applied.
#[derive(Debug, Clone)]
pub struct PreviewTicket {
    generation: u64,
    pub request: GenerateSqlRequest,
}

/// Generated SQL for the current builder configuration.
#[derive(Debug)]
pub struct SqlPreview {
    sql: String,
    error: Option<String>,
    complexity: Option<Complexity>,
    generation: u64,
    loading: bool,
}

impl Default for SqlPreview {
    fn default() -> Self {
        Self {
            sql: PLACEHOLDER_SQL.to_string(),
            error: None,
            complexity: None,
            generation: 0,
            loading: false,
        }
    }
}

impl SqlPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Message for the error panel, set when the last generation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn complexity(&self) -> Option<Complexity> {
        self.complexity
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start deriving SQL for `config`. With no tables the placeholder is
    /// shown immediately and `None` is returned: there is nothing to send.
    /// Either way any earlier in-flight request becomes stale.
    pub fn begin(&mut self, connection_id: &str, config: &VisualQueryConfig) -> Option<PreviewTicket> {
        self.generation += 1;
        self.complexity = config.complexity();

        if config.tables.is_empty() {
            self.sql = PLACEHOLDER_SQL.to_string();
            self.error = None;
            self.loading = false;
            return None;
        }

        self.loading = true;
        Some(PreviewTicket {
            generation: self.generation,
            request: GenerateSqlRequest {
                connection_id: connection_id.to_string(),
                config: config.clone(),
            },
        })
    }

    /// Apply a finished request. Returns `false` when a newer `begin`
    /// superseded it.
    pub fn complete(&mut self, ticket: &PreviewTicket, result: ApiResult<String>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping stale SQL preview"
            );
            return false;
        }
        self.loading = false;

        match result {
            Ok(sql) => {
                self.sql = sql;
                self.error = None;
            }
            Err(e) => {
                let message = e.user_message();
                warn!(error = %message, "SQL generation failed");
                self.sql = format!("-- Error generating SQL: {}", message);
                self.error = Some(message);
            }
        }
        true
    }

    pub async fn generate(api: &ApiClient, request: &GenerateSqlRequest) -> ApiResult<String> {
        let resp: GenerateSqlResponse = api.post(GENERATE_SQL_PATH, request).await?;
        Ok(resp.sql)
    }

    /// `begin`, generate and `complete` in one go. Returns whether the
    /// displayed SQL was updated from the network.
    pub async fn refresh(&mut self, api: &ApiClient, connection_id: &str, config: &VisualQueryConfig) -> bool {
        let Some(ticket) = self.begin(connection_id, config) else {
            return false;
        };
        let result = Self::generate(api, &ticket.request).await;
        self.complete(&ticket, result)
    }
}
