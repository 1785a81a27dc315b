use crate::schema::TableSchema;
use serde::Serialize;

/// One row in the table picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerEntry {
    pub name: String,
    pub schema: Option<String>,
    pub column_count: usize,
    pub on_canvas: bool,
}

/// Search box state for the table picker.
#[derive(Debug, Default, Clone)]
pub struct TablePicker {
    search: String,
}

impl TablePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn clear(&mut self) {
        self.search.clear();
    }

    fn matches(&self, table: &TableSchema) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || table.name.to_lowercase().contains(&needle)
            || table.qualified_name().to_lowercase().contains(&needle)
    }

    /// Tables matching the search, in schema order. `on_canvas` marks the
    /// ones that would be rejected as duplicates.
    pub fn entries(&self, tables: &[TableSchema], on_canvas: &[String]) -> Vec<PickerEntry> {
        tables
            .iter()
            .filter(|t| self.matches(t))
            .map(|t| PickerEntry {
                name: t.name.clone(),
                schema: t.schema.clone(),
                column_count: t.columns.len(),
                on_canvas: on_canvas.iter().any(|n| *n == t.name),
            })
            .collect()
    }
}
