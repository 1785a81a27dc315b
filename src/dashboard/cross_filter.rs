use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::debug;

/// A filter published by one chart (e.g. clicking a bar) for the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossFilter {
    pub source_chart_id: String,
    pub field: String,
    pub value: Value,
}

/// Shared cross-filter list, handed to each chart explicitly.
///
/// A chart's new filter replaces its earlier ones unless the caller allows
/// multiple filters. Subscribers see the full list after every change.
pub struct CrossFilterStore {
    filters: RwLock<Vec<CrossFilter>>,
    tx: watch::Sender<Vec<CrossFilter>>,
}

impl Default for CrossFilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossFilterStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            filters: RwLock::new(Vec::new()),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<CrossFilter>> {
        self.tx.subscribe()
    }

    fn publish(&self, filters: &[CrossFilter]) {
        self.tx.send_replace(filters.to_vec());
    }

    pub async fn add(&self, filter: CrossFilter, allow_multiple: bool) {
        let mut filters = self.filters.write().await;
        if allow_multiple {
            // The same field/value twice is still one filter.
            if filters.iter().any(|f| *f == filter) {
                return;
            }
        } else {
            filters.retain(|f| f.source_chart_id != filter.source_chart_id);
        }
        debug!(source = %filter.source_chart_id, field = %filter.field, "cross-filter added");
        filters.push(filter);
        self.publish(&filters);
    }

    /// Remove one chart's filters on `field`. Returns how many were removed.
    pub async fn remove(&self, source_chart_id: &str, field: &str) -> usize {
        let mut filters = self.filters.write().await;
        let before = filters.len();
        filters.retain(|f| !(f.source_chart_id == source_chart_id && f.field == field));
        let removed = before - filters.len();
        if removed > 0 {
            self.publish(&filters);
        }
        removed
    }

    pub async fn clear_source(&self, source_chart_id: &str) -> usize {
        let mut filters = self.filters.write().await;
        let before = filters.len();
        filters.retain(|f| f.source_chart_id != source_chart_id);
        let removed = before - filters.len();
        if removed > 0 {
            self.publish(&filters);
        }
        removed
    }

    pub async fn clear_all(&self) {
        let mut filters = self.filters.write().await;
        if !filters.is_empty() {
            filters.clear();
            self.publish(&filters);
        }
    }

    pub async fn all(&self) -> Vec<CrossFilter> {
        self.filters.read().await.clone()
    }

    pub async fn list_by_source(&self, source_chart_id: &str) -> Vec<CrossFilter> {
        self.filters
            .read()
            .await
            .iter()
            .filter(|f| f.source_chart_id == source_chart_id)
            .cloned()
            .collect()
    }

    /// Filters a chart should apply: everyone's but its own.
    pub async fn filters_for(&self, chart_id: &str) -> Vec<CrossFilter> {
        self.filters
            .read()
            .await
            .iter()
            .filter(|f| f.source_chart_id != chart_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(source: &str, field: &str, value: Value) -> CrossFilter {
        CrossFilter {
            source_chart_id: source.into(),
            field: field.into(),
            value,
        }
    }

    #[tokio::test]
    async fn test_single_mode_replaces_own_filters() {
        let store = CrossFilterStore::new();
        store.add(filter("bar", "region", json!("EMEA")), false).await;
        store.add(filter("pie", "segment", json!("SMB")), false).await;
        store.add(filter("bar", "region", json!("APAC")), false).await;

        let bar = store.list_by_source("bar").await;
        assert_eq!(bar, vec![filter("bar", "region", json!("APAC"))]);
        assert_eq!(store.all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_multiple_mode_accumulates() {
        let store = CrossFilterStore::new();
        store.add(filter("bar", "region", json!("EMEA")), true).await;
        store.add(filter("bar", "region", json!("APAC")), true).await;
        store.add(filter("bar", "region", json!("APAC")), true).await;

        assert_eq!(store.list_by_source("bar").await.len(), 2);
        assert_eq!(store.remove("bar", "region").await, 2);
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_filters_for_excludes_own() {
        let store = CrossFilterStore::new();
        store.add(filter("bar", "region", json!("EMEA")), false).await;
        store.add(filter("line", "month", json!("2024-05")), false).await;

        let for_bar = store.filters_for("bar").await;
        assert_eq!(for_bar.len(), 1);
        assert_eq!(for_bar[0].source_chart_id, "line");
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = CrossFilterStore::new();
        let mut rx = store.subscribe();

        store.add(filter("bar", "region", json!("EMEA")), false).await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        store.clear_all().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }
}
