use crate::schema::TableSchema;
use serde::{Deserialize, Serialize};

/// Schema context sent to the assistant. Never contains row data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaContext {
    pub tables: Vec<TableContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableContext {
    pub name: String,
    pub columns: Vec<ColumnContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnContext {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

impl SchemaContext {
    pub fn from_tables(tables: &[TableSchema]) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|t| TableContext {
                    name: t.qualified_name(),
                    columns: t
                        .columns
                        .iter()
                        .map(|c| ColumnContext {
                            name: c.name.clone(),
                            data_type: c.data_type.clone(),
                            is_primary_key: c.is_primary_key,
                            is_foreign_key: c.is_foreign_key,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn to_ddl_summary(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            out.push_str(&format!("CREATE TABLE {} (\n", table.name));
            for (i, col) in table.columns.iter().enumerate() {
                let mut parts = vec![format!("  {} {}", col.name, col.data_type)];
                if col.is_primary_key {
                    parts.push("PRIMARY KEY".into());
                }
                let suffix = if i + 1 < table.columns.len() { "," } else { "" };
                let note = if col.is_foreign_key { " -- foreign key" } else { "" };
                out.push_str(&format!("{}{}{}\n", parts.join(" "), suffix, note));
            }
            out.push_str(");\n\n");
        }
        out
    }
}
