use super::context::SchemaContext;
use crate::api::{ApiClient, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const EXPLAIN_PATH: &[&str] = &["api", "ai", "explain"];
pub const AI_GENERATE_SQL_PATH: &[&str] = &["api", "ai", "generate-sql"];

/// Rows beyond this are dropped before a result set is sent for explanation.
pub const EXPLAIN_ROW_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct ExplainRequest<'a> {
    pub data: &'a [Value],
    pub context: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Insights {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ExplainResponse {
    insights: Insights,
}

#[derive(Debug, Serialize)]
pub struct AiGenerateSqlRequest<'a> {
    pub connection_id: &'a str,
    pub prompt: &'a str,
    pub schema: String,
}

#[derive(Debug, Deserialize)]
struct AiGenerateSqlResponse {
    sql: String,
}

/// Backend-hosted assistant. The provider itself sits behind the backend;
/// this side only shapes requests and cleans up replies.
#[derive(Debug, Clone)]
pub struct Assistant {
    api: ApiClient,
}

impl Assistant {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask for insights about a result set. `context` is free-form (chart
    /// title, the query, ...).
    pub async fn explain(&self, rows: &[Value], context: &Value) -> ApiResult<Vec<String>> {
        let data = truncate_rows(rows);
        debug!(sent = data.len(), total = rows.len(), "explaining result set");
        let resp: ExplainResponse = self
            .api
            .post(EXPLAIN_PATH, &ExplainRequest { data, context })
            .await?;
        Ok(match resp.insights {
            Insights::Text(text) => vec![text],
            Insights::List(items) => items,
        })
    }

    /// Natural language to SQL against `schema`.
    pub async fn generate_sql(
        &self,
        connection_id: &str,
        prompt: &str,
        schema: &SchemaContext,
    ) -> ApiResult<String> {
        let req = AiGenerateSqlRequest {
            connection_id,
            prompt,
            schema: schema.to_ddl_summary(),
        };
        let resp: AiGenerateSqlResponse = self.api.post(AI_GENERATE_SQL_PATH, &req).await?;
        Ok(strip_code_fences(&resp.sql))
    }
}

pub fn truncate_rows(rows: &[Value]) -> &[Value] {
    &rows[..rows.len().min(EXPLAIN_ROW_LIMIT)]
}

/// Strip markdown code fences (```sql ... ``` or ``` ... ```).
pub fn strip_code_fences(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // language tag
        let rest = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
        let rest = rest.trim_end();
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        rest.trim().to_string()
    } else {
        trimmed.to_string()
    }
}
