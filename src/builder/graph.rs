use super::config::VisualQueryConfig;
use super::suggestions::JoinSuggestion;
use super::BuilderError;
use crate::ids::IdGenerator;
use crate::notify::{Notification, Notifications};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

const GRID_COLUMNS: usize = 3;
const GRID_ORIGIN: f64 = 50.0;
const GRID_DX: f64 = 280.0;
const GRID_DY: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Slot for the `index`-th table on the canvas, three per row.
    pub fn grid(index: usize) -> Self {
        Self {
            x: GRID_ORIGIN + (index % GRID_COLUMNS) as f64 * GRID_DX,
            y: GRID_ORIGIN + (index / GRID_COLUMNS) as f64 * GRID_DY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub id: String,
    pub table_name: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    #[default]
    #[serde(rename = "INNER")]
    Inner,
    #[serde(rename = "LEFT")]
    Left,
    #[serde(rename = "RIGHT")]
    Right,
    #[serde(rename = "FULL OUTER")]
    FullOuter,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::FullOuter => "FULL OUTER",
        }
    }
}

impl std::str::FromStr for JoinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            "FULL" | "FULL OUTER" => Ok(JoinType::FullOuter),
            other => Err(format!("unknown join type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEdge {
    pub id: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub join_type: JoinType,
}

impl JoinEdge {
    pub fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }

    /// Same endpoints, in either direction.
    pub fn connects(&self, spec: &JoinSpec) -> bool {
        let forward = self.from_table == spec.from_table
            && self.from_column == spec.from_column
            && self.to_table == spec.to_table
            && self.to_column == spec.to_column;
        let reverse = self.from_table == spec.to_table
            && self.from_column == spec.to_column
            && self.to_table == spec.from_table
            && self.to_column == spec.from_column;
        forward || reverse
    }
}

/// A join the user asked for, before it gets an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub join_type: Option<JoinType>,
}

impl JoinSpec {
    pub fn new(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> Self {
        Self {
            from_table: from_table.to_string(),
            from_column: from_column.to_string(),
            to_table: to_table.to_string(),
            to_column: to_column.to_string(),
            join_type: None,
        }
    }

    pub fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }
}

impl From<&JoinSuggestion> for JoinSpec {
    fn from(s: &JoinSuggestion) -> Self {
        Self {
            from_table: s.from_table.clone(),
            from_column: s.from_column.clone(),
            to_table: s.to_table.clone(),
            to_column: s.to_column.clone(),
            join_type: Some(s.join_type),
        }
    }
}

/// Payload handed to the change listener after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryChange {
    pub tables: Vec<String>,
    pub joins: Vec<JoinEdge>,
}

type ChangeListener = Box<dyn FnMut(&QueryChange) + Send>;

/// Tables on the canvas and the joins between them.
pub struct JoinGraph {
    nodes: Vec<TableNode>,
    edges: Vec<JoinEdge>,
    ids: Arc<dyn IdGenerator>,
    notifications: Notifications,
    on_change: Option<ChangeListener>,
}

impl std::fmt::Debug for JoinGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinGraph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edges)
            .finish()
    }
}

impl JoinGraph {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            ids,
            notifications: Notifications::default(),
            on_change: None,
        }
    }

    /// Rebuild a canvas from a saved configuration. Tables are laid out on
    /// the grid in order; saved joins keep their ids. Duplicate tables and
    /// duplicate joins in the saved data are skipped.
    pub fn from_config(config: &VisualQueryConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let mut graph = Self::new(ids);
        for table in &config.tables {
            if graph.contains_table(table) {
                continue;
            }
            let id = graph.ids.next_id("node");
            let position = Position::grid(graph.nodes.len());
            graph.nodes.push(TableNode {
                id,
                table_name: table.clone(),
                position,
            });
        }
        for edge in &config.joins {
            let spec = JoinSpec::from(edge);
            if graph.edges.iter().any(|e| e.connects(&spec)) {
                continue;
            }
            graph.edges.push(edge.clone());
        }
        graph
    }

    /// Register the single listener that receives every `QueryChange`.
    pub fn on_query_change<F>(&mut self, listener: F)
    where
        F: FnMut(&QueryChange) + Send + 'static,
    {
        self.on_change = Some(Box::new(listener));
    }

    pub fn nodes(&self) -> &[TableNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    pub fn contains_table(&self, table_name: &str) -> bool {
        self.nodes.iter().any(|n| n.table_name == table_name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.table_name.clone()).collect()
    }

    /// Order-independent key used to decide when suggestions are stale.
    pub fn table_set(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|n| n.table_name.clone()).collect()
    }

    pub fn snapshot(&self) -> QueryChange {
        QueryChange {
            tables: self.table_names(),
            joins: self.edges.clone(),
        }
    }

    /// Messages from mutations since the last drain, oldest first. Callers
    /// that never drain only see the newest [`crate::notify::MAX_PENDING`].
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    fn emit_change(&mut self) {
        let change = self.snapshot();
        if let Some(listener) = self.on_change.as_mut() {
            listener(&change);
        }
    }

    /// Place a table on the canvas (drop onto the canvas zone).
    pub fn add_table(&mut self, table_name: &str) -> Result<TableNode, BuilderError> {
        if self.contains_table(table_name) {
            self.notifications
                .warning(format!("Table {} is already in the query", table_name));
            return Err(BuilderError::DuplicateTable(table_name.to_string()));
        }

        let node = TableNode {
            id: self.ids.next_id("node"),
            table_name: table_name.to_string(),
            position: Position::grid(self.nodes.len()),
        };
        info!(table = table_name, node = %node.id, "table added");
        self.nodes.push(node.clone());
        self.notifications.success(format!("Added {}", table_name));
        self.emit_change();
        Ok(node)
    }

    /// Remove a node and every join touching its table.
    pub fn remove_table(&mut self, node_id: &str) -> Result<TableNode, BuilderError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| BuilderError::NodeNotFound(node_id.to_string()))?;
        let node = self.nodes.remove(index);

        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(&node.table_name));
        let dropped = before - self.edges.len();

        info!(table = %node.table_name, dropped_joins = dropped, "table removed");
        self.notifications
            .info(format!("Removed {}", node.table_name));
        self.emit_change();
        Ok(node)
    }

    pub fn move_table(&mut self, node_id: &str, position: Position) -> Result<(), BuilderError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| BuilderError::NodeNotFound(node_id.to_string()))?;
        node.position = position;
        self.emit_change();
        Ok(())
    }

    pub fn add_join(&mut self, spec: JoinSpec) -> Result<JoinEdge, BuilderError> {
        if self.edges.iter().any(|e| e.connects(&spec)) {
            self.notifications.warning(format!(
                "Join {}.{} = {}.{} already exists",
                spec.from_table, spec.from_column, spec.to_table, spec.to_column
            ));
            return Err(BuilderError::DuplicateJoin {
                from: format!("{}.{}", spec.from_table, spec.from_column),
                to: format!("{}.{}", spec.to_table, spec.to_column),
            });
        }

        let edge = JoinEdge {
            id: self.ids.next_id("join"),
            from_table: spec.from_table,
            from_column: spec.from_column,
            to_table: spec.to_table,
            to_column: spec.to_column,
            join_type: spec.join_type.unwrap_or_default(),
        };
        info!(join = %edge.id, from = %edge.from_table, to = %edge.to_table, "join added");
        self.edges.push(edge.clone());
        self.notifications.success(format!(
            "Joined {} to {}",
            edge.from_table, edge.to_table
        ));
        self.emit_change();
        Ok(edge)
    }

    /// Same as a manual join with the suggested endpoints and type.
    pub fn apply_suggestion(&mut self, suggestion: &JoinSuggestion) -> Result<JoinEdge, BuilderError> {
        self.add_join(JoinSpec::from(suggestion))
    }

    pub fn remove_join(&mut self, join_id: &str) -> Result<JoinEdge, BuilderError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == join_id)
            .ok_or_else(|| BuilderError::JoinNotFound(join_id.to_string()))?;
        let edge = self.edges.remove(index);
        self.notifications.info("Join removed");
        self.emit_change();
        Ok(edge)
    }

    pub fn update_join_type(&mut self, join_id: &str, join_type: JoinType) -> Result<(), BuilderError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == join_id)
            .ok_or_else(|| BuilderError::JoinNotFound(join_id.to_string()))?;
        edge.join_type = join_type;
        self.emit_change();
        Ok(())
    }
}

impl From<&JoinEdge> for JoinSpec {
    fn from(e: &JoinEdge) -> Self {
        Self {
            from_table: e.from_table.clone(),
            from_column: e.from_column.clone(),
            to_table: e.to_table.clone(),
            to_column: e.to_column.clone(),
            join_type: Some(e.join_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::notify::Level;
    use std::sync::Mutex;

    fn graph() -> JoinGraph {
        JoinGraph::new(Arc::new(SequentialIds::new()))
    }

    #[test]
    fn test_grid_positions() {
        let mut g = graph();
        let positions: Vec<Position> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| g.add_table(t).unwrap().position)
            .collect();

        assert_eq!(positions[0], Position { x: 50.0, y: 50.0 });
        assert_eq!(positions[1], Position { x: 330.0, y: 50.0 });
        assert_eq!(positions[2], Position { x: 610.0, y: 50.0 });
        assert_eq!(positions[3], Position { x: 50.0, y: 300.0 });
    }

    #[test]
    fn test_duplicate_table_rejected_without_touching_joins() {
        let mut g = graph();
        g.add_table("orders").unwrap();
        g.add_table("customers").unwrap();
        g.add_join(JoinSpec::new("orders", "customer_id", "customers", "id"))
            .unwrap();
        let edges_before = g.edges().to_vec();
        g.drain_notifications();

        let err = g.add_table("orders").unwrap_err();

        assert_eq!(err, BuilderError::DuplicateTable("orders".into()));
        assert_eq!(g.nodes().len(), 2);
        assert_eq!(g.edges(), edges_before.as_slice());
        let notes = g.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, Level::Warning);
    }

    #[test]
    fn test_long_session_without_draining_stays_bounded() {
        let mut g = graph();
        for i in 0..100 {
            let node = g.add_table(&format!("t{}", i)).unwrap();
            g.remove_table(&node.id).unwrap();
        }
        let notes = g.drain_notifications();
        assert_eq!(notes.len(), crate::notify::MAX_PENDING);
        assert!(notes.last().unwrap().message.contains("t99"));
        assert!(g.drain_notifications().is_empty());
    }

    #[test]
    fn test_remove_table_cascades_only_its_joins() {
        let mut g = graph();
        let orders = g.add_table("orders").unwrap();
        g.add_table("customers").unwrap();
        g.add_table("products").unwrap();
        g.add_table("regions").unwrap();
        g.add_join(JoinSpec::new("orders", "customer_id", "customers", "id"))
            .unwrap();
        g.add_join(JoinSpec::new("products", "id", "orders", "product_id"))
            .unwrap();
        let kept = g
            .add_join(JoinSpec::new("customers", "region_id", "regions", "id"))
            .unwrap();

        g.remove_table(&orders.id).unwrap();

        assert_eq!(g.edges(), &[kept]);
        assert!(!g.contains_table("orders"));
    }

    #[test]
    fn test_reverse_duplicate_join_rejected() {
        let mut g = graph();
        g.add_join(JoinSpec::new("a", "c1", "b", "c2")).unwrap();

        let err = g.add_join(JoinSpec::new("b", "c2", "a", "c1")).unwrap_err();
        assert!(matches!(err, BuilderError::DuplicateJoin { .. }));

        // A different column pair between the same tables is fine.
        g.add_join(JoinSpec::new("a", "c1", "b", "c3")).unwrap();
        assert_eq!(g.edges().len(), 2);
    }

    #[test]
    fn test_join_defaults_to_inner_and_updates_in_place() {
        let mut g = graph();
        let edge = g.add_join(JoinSpec::new("a", "id", "b", "a_id")).unwrap();
        assert_eq!(edge.join_type, JoinType::Inner);

        g.update_join_type(&edge.id, JoinType::Left).unwrap();
        assert_eq!(g.edges()[0].join_type, JoinType::Left);
        assert_eq!(g.edges()[0].id, edge.id);

        assert_eq!(
            g.update_join_type("join-99", JoinType::Right),
            Err(BuilderError::JoinNotFound("join-99".into()))
        );
    }

    #[test]
    fn test_remove_join_by_id() {
        let mut g = graph();
        g.add_table("a").unwrap();
        g.add_table("b").unwrap();
        let edge = g.add_join(JoinSpec::new("a", "id", "b", "a_id")).unwrap();

        g.remove_join(&edge.id).unwrap();
        assert!(g.edges().is_empty());
        assert_eq!(g.nodes().len(), 2);
    }

    #[test]
    fn test_every_mutation_notifies_listener() {
        let seen: Arc<Mutex<Vec<QueryChange>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut g = graph();
        g.on_query_change(move |change| sink.lock().unwrap().push(change.clone()));

        let a = g.add_table("a").unwrap();
        g.add_table("b").unwrap();
        let j = g.add_join(JoinSpec::new("a", "id", "b", "a_id")).unwrap();
        g.update_join_type(&j.id, JoinType::FullOuter).unwrap();
        g.remove_table(&a.id).unwrap();
        let _ = g.add_table("b");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[3].joins[0].join_type, JoinType::FullOuter);
        assert_eq!(seen[4].tables, vec!["b".to_string()]);
        assert!(seen[4].joins.is_empty());
    }

    #[test]
    fn test_from_config_lays_out_and_dedupes() {
        let config = VisualQueryConfig {
            tables: vec!["a".into(), "b".into(), "a".into()],
            joins: vec![
                JoinEdge {
                    id: "saved-1".into(),
                    from_table: "a".into(),
                    from_column: "id".into(),
                    to_table: "b".into(),
                    to_column: "a_id".into(),
                    join_type: JoinType::Left,
                },
                JoinEdge {
                    id: "saved-2".into(),
                    from_table: "b".into(),
                    from_column: "a_id".into(),
                    to_table: "a".into(),
                    to_column: "id".into(),
                    join_type: JoinType::Inner,
                },
            ],
            ..Default::default()
        };

        let g = JoinGraph::from_config(&config, Arc::new(SequentialIds::new()));
        assert_eq!(g.table_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(g.nodes()[1].position, Position::grid(1));
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.edges()[0].id, "saved-1");
    }

    #[test]
    fn test_join_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&JoinType::FullOuter).unwrap(),
            "\"FULL OUTER\""
        );
        assert_eq!("full_outer".parse::<JoinType>(), Ok(JoinType::FullOuter));
        assert_eq!("left".parse::<JoinType>(), Ok(JoinType::Left));
        assert!("cross".parse::<JoinType>().is_err());
    }
}
