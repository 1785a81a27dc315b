use super::graph::{JoinEdge, JoinSpec, JoinType};
use crate::api::{ApiClient, ApiResult};
use crate::notify::Notifications;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const SUGGESTIONS_PATH: &[&str] = &["api", "visual-queries", "join-suggestions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuggestion {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub join_type: JoinType,
    pub confidence: Confidence,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub connection_id: String,
    pub table_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    suggestions: Vec<JoinSuggestion>,
}

/// A suggestion fetch that has been started but not applied.
#[derive(Debug, Clone)]
pub struct SuggestionTicket {
    generation: u64,
    pub request: SuggestionRequest,
}

/// Join suggestions for the tables currently on the canvas.
///
/// Each fetch carries a generation number; a response is applied only if
/// no newer fetch (or table-set change) happened since it was started.
#[derive(Debug, Default)]
pub struct JoinSuggestions {
    connection_id: String,
    tables: BTreeSet<String>,
    suggestions: Vec<JoinSuggestion>,
    generation: u64,
    in_flight: bool,
}

impl JoinSuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suggestions(&self) -> &[JoinSuggestion] {
        &self.suggestions
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Record the current connection and table set. Returns a ticket when
    /// either changed and there are at least two tables. Fewer than two
    /// tables clears the list and invalidates any pending fetch.
    pub fn begin(&mut self, connection_id: &str, tables: &BTreeSet<String>) -> Option<SuggestionTicket> {
        if *tables == self.tables && connection_id == self.connection_id {
            return None;
        }
        self.connection_id = connection_id.to_string();
        self.tables = tables.clone();
        self.generation += 1;

        if tables.len() < 2 {
            self.suggestions.clear();
            self.in_flight = false;
            return None;
        }

        self.in_flight = true;
        Some(SuggestionTicket {
            generation: self.generation,
            request: SuggestionRequest {
                connection_id: connection_id.to_string(),
                table_names: tables.iter().cloned().collect(),
            },
        })
    }

    /// Apply a finished fetch. Returns `false` if the ticket was stale.
    pub fn complete(
        &mut self,
        ticket: &SuggestionTicket,
        result: ApiResult<Vec<JoinSuggestion>>,
        notifications: &mut Notifications,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping stale join suggestions"
            );
            return false;
        }
        self.in_flight = false;

        match result {
            Ok(suggestions) => {
                self.suggestions = suggestions;
            }
            Err(e) => {
                warn!(error = %e, "join suggestions failed");
                self.suggestions.clear();
                notifications.error(format!("Could not load join suggestions: {}", e.user_message()));
            }
        }
        true
    }

    pub async fn fetch(api: &ApiClient, request: &SuggestionRequest) -> ApiResult<Vec<JoinSuggestion>> {
        let resp: SuggestionResponse = api.post(SUGGESTIONS_PATH, request).await?;
        Ok(resp.suggestions)
    }

    /// `begin`, fetch and `complete` in one go.
    pub async fn refresh(
        &mut self,
        api: &ApiClient,
        connection_id: &str,
        tables: &BTreeSet<String>,
        notifications: &mut Notifications,
    ) -> bool {
        let Some(ticket) = self.begin(connection_id, tables) else {
            return false;
        };
        let result = Self::fetch(api, &ticket.request).await;
        self.complete(&ticket, result, notifications)
    }

    /// Suggestions not already present among `existing` joins.
    pub fn unapplied<'a>(&'a self, existing: &'a [JoinEdge]) -> impl Iterator<Item = &'a JoinSuggestion> {
        self.suggestions.iter().filter(move |s| {
            let spec = JoinSpec::from(*s);
            !existing.iter().any(|e| e.connects(&spec))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use reqwest::StatusCode;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn suggestion(from: &str, to: &str) -> JoinSuggestion {
        JoinSuggestion {
            from_table: from.into(),
            from_column: format!("{}_id", to),
            to_table: to.into(),
            to_column: "id".into(),
            join_type: JoinType::Inner,
            confidence: Confidence::High,
            reason: "foreign key".into(),
        }
    }

    #[test]
    fn test_single_table_never_fetches() {
        let mut s = JoinSuggestions::new();
        assert!(s.begin("c1", &set(&["orders"])).is_none());
        assert!(s.suggestions().is_empty());
    }

    #[test]
    fn test_unchanged_set_does_not_refetch() {
        let mut s = JoinSuggestions::new();
        let mut notes = Notifications::default();
        let ticket = s.begin("c1", &set(&["a", "b"])).unwrap();
        assert_eq!(ticket.request.table_names, vec!["a", "b"]);
        s.complete(&ticket, Ok(vec![suggestion("a", "b")]), &mut notes);

        assert!(s.begin("c1", &set(&["b", "a"])).is_none());
        assert_eq!(s.suggestions().len(), 1);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut s = JoinSuggestions::new();
        let mut notes = Notifications::default();
        let first = s.begin("c1", &set(&["a", "b"])).unwrap();
        let second = s.begin("c1", &set(&["a", "b", "c"])).unwrap();

        assert!(s.complete(&second, Ok(vec![suggestion("a", "c")]), &mut notes));
        assert!(!s.complete(&first, Ok(vec![suggestion("a", "b")]), &mut notes));

        assert_eq!(s.suggestions()[0].to_table, "c");
        assert!(!s.is_loading());
    }

    #[test]
    fn test_failure_clears_and_notifies() {
        let mut s = JoinSuggestions::new();
        let mut notes = Notifications::default();
        let ticket = s.begin("c1", &set(&["a", "b"])).unwrap();
        s.complete(&ticket, Ok(vec![suggestion("a", "b")]), &mut notes);

        let ticket = s.begin("c1", &set(&["a", "b", "c"])).unwrap();
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        s.complete(&ticket, Err(err), &mut notes);

        assert!(s.suggestions().is_empty());
        assert_eq!(notes.drain().len(), 1);
    }

    #[test]
    fn test_shrinking_below_two_clears() {
        let mut s = JoinSuggestions::new();
        let mut notes = Notifications::default();
        let ticket = s.begin("c1", &set(&["a", "b"])).unwrap();
        s.complete(&ticket, Ok(vec![suggestion("a", "b")]), &mut notes);

        assert!(s.begin("c1", &set(&["a"])).is_none());
        assert!(s.suggestions().is_empty());
    }

    #[test]
    fn test_decodes_wire_format() {
        let json = r#"{"fromTable":"orders","fromColumn":"customer_id","toTable":"customers","toColumn":"id","joinType":"LEFT","confidence":"medium","reason":"naming"}"#;
        let s: JoinSuggestion = serde_json::from_str(json).unwrap();
        assert_eq!(s.join_type, JoinType::Left);
        assert_eq!(s.confidence, Confidence::Medium);
    }
}
