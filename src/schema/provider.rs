use super::types::{ColumnInfo, SchemaResponse, TableSchema};
use crate::api::{ApiClient, ApiResult};
use tracing::{info, warn};

/// Tables and columns known for one connection.
///
/// A failed refresh keeps the previously loaded tables.
#[derive(Debug, Default)]
pub struct SchemaProvider {
    connection_id: Option<String>,
    tables: Vec<TableSchema>,
}

impl SchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider preloaded with tables, for callers that already have them.
    pub fn with_tables(connection_id: &str, tables: Vec<TableSchema>) -> Self {
        Self {
            connection_id: Some(connection_id.to_string()),
            tables,
        }
    }

    pub async fn refresh(&mut self, api: &ApiClient, connection_id: &str) -> ApiResult<usize> {
        let path = ["api", "connections", connection_id, "schema"];
        match api.get::<SchemaResponse>(&path).await {
            Ok(resp) => {
                info!(connection_id, tables = resp.tables.len(), "schema loaded");
                self.connection_id = Some(connection_id.to_string());
                self.tables = resp.tables;
                Ok(self.tables.len())
            }
            Err(e) => {
                warn!(connection_id, error = %e, "failed to load schema");
                Err(e)
            }
        }
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn columns(&self, table: &str) -> &[ColumnInfo] {
        self.table(table).map(|t| t.columns.as_slice()).unwrap_or(&[])
    }

    pub fn primary_keys(&self, table: &str) -> Vec<&ColumnInfo> {
        self.columns(table).iter().filter(|c| c.is_primary_key).collect()
    }

    pub fn foreign_keys(&self, table: &str) -> Vec<&ColumnInfo> {
        self.columns(table).iter().filter(|c| c.is_foreign_key).collect()
    }
}
