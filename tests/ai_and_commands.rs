mod common;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::serve;
use insightdeck_lib::ai::{Assistant, ChatSession, Role, SchemaContext};
use insightdeck_lib::builder::VisualQueryConfig;
use insightdeck_lib::commands::{self, AppState};
use insightdeck_lib::config::Settings;
use insightdeck_lib::storage::LocalDb;
use serde_json::{json, Value};

fn ai_router() -> Router {
    Router::new()
        .route(
            "/api/ai/explain",
            post(|Json(body): Json<Value>| async move {
                let sent = body["data"].as_array().map(Vec::len).unwrap_or_default();
                Json(json!({"insights": [format!("saw {} rows", sent), body["context"].clone()]}))
            }),
        )
        .route(
            "/api/ai/generate-sql",
            post(|Json(body): Json<Value>| async move {
                assert!(body["schema"].as_str().unwrap().contains("CREATE TABLE public.orders"));
                assert_eq!(body["connection_id"], "warehouse");
                Json(json!({"sql": "```sql\nSELECT count(*) FROM public.orders\n```"}))
            }),
        )
        .route(
            "/api/ai/chat",
            post(|Json(body): Json<Value>| async move {
                let messages = body["messages"].as_array().unwrap();
                let last = messages.last().unwrap()["content"].as_str().unwrap().to_string();
                if last == "fail" {
                    return (StatusCode::BAD_GATEWAY, Json(json!({"error": "provider down"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({"reply": format!("{} messages so far", messages.len())})),
                )
            }),
        )
        .route(
            "/api/connections/{id}/schema",
            get(|Path(_id): Path<String>| async {
                Json(json!({
                    "tables": [{"name": "orders", "schema": "public", "columns": [
                        {"name": "id", "type": "integer", "isPrimaryKey": true}
                    ]}]
                }))
            }),
        )
        .route(
            "/api/visual-queries/generate-sql",
            post(|Json(body): Json<Value>| async move {
                if body["config"]["tables"][0] == "ghost" {
                    return (StatusCode::BAD_REQUEST, Json(json!({"error": "unknown table ghost"})));
                }
                (StatusCode::OK, Json(json!({"sql": "SELECT * FROM orders"})))
            }),
        )
}

#[tokio::test]
async fn explain_sends_at_most_fifty_rows() {
    let api = serve(ai_router()).await;
    let rows: Vec<Value> = (0..75).map(|i| json!({"month": i, "revenue": i * 10})).collect();
    let insights = Assistant::new(api)
        .explain(&rows, &json!("Revenue by month"))
        .await
        .unwrap();
    assert_eq!(insights, vec!["saw 50 rows", "Revenue by month"]);
}

#[tokio::test]
async fn generated_sql_has_fences_stripped() {
    let api = serve(ai_router()).await;
    let tables: Vec<insightdeck_lib::schema::TableSchema> = serde_json::from_value(json!([
        {"name": "orders", "schema": "public", "columns": [{"name": "id", "type": "integer"}]}
    ]))
    .unwrap();
    let sql = Assistant::new(api)
        .generate_sql("warehouse", "how many orders", &SchemaContext::from_tables(&tables))
        .await
        .unwrap();
    assert_eq!(sql, "SELECT count(*) FROM public.orders");
}

#[tokio::test]
async fn chat_keeps_history_and_rolls_back_failures() {
    let api = serve(ai_router()).await;
    let mut chat = ChatSession::new(json!({"dashboard": "sales"}));

    assert_eq!(chat.send(&api, "hello").await.unwrap(), "1 messages so far");
    assert_eq!(chat.send(&api, "and now?").await.unwrap(), "3 messages so far");
    assert_eq!(chat.messages().len(), 4);

    let err = chat.send(&api, "fail").await.unwrap_err();
    assert_eq!(err.user_message(), "provider down");
    assert_eq!(chat.messages().len(), 4);
    assert_eq!(chat.messages()[3].role, Role::Assistant);
}

async fn state(dir: &tempfile::TempDir) -> AppState {
    let api = serve(ai_router()).await;
    let mut settings = Settings::default();
    settings.api.base_url = api.base_url().to_string();
    settings.storage.path = Some(dir.path().join("nested").join("local.db"));
    let local_db = LocalDb::open(&settings.storage.resolved_path()).unwrap();
    AppState::with_parts(settings, api, local_db)
}

#[tokio::test]
async fn preview_command_records_history() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;
    let config = VisualQueryConfig {
        tables: vec!["orders".into(), "customers".into()],
        ..Default::default()
    };

    let output = commands::preview_sql(&state, "warehouse", &config).await.unwrap();
    assert_eq!(output.sql, "SELECT * FROM orders");
    assert_eq!(output.complexity, Some("Simple"));

    let empty = commands::preview_sql(&state, "warehouse", &VisualQueryConfig::default())
        .await
        .unwrap();
    assert_eq!(empty.complexity, None);

    let history = commands::sql_history(&state, Some("warehouse"), 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(output.ensure_generated().is_ok());
    assert_eq!(history[0].sql, "SELECT * FROM orders");
    assert!(dir.path().join("nested").join("local.db").exists());
}

#[tokio::test]
async fn failed_preview_is_reported_as_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;
    let config = VisualQueryConfig {
        tables: vec!["ghost".into()],
        ..Default::default()
    };

    let output = commands::preview_sql(&state, "warehouse", &config).await.unwrap();
    assert_eq!(output.sql, "-- Error generating SQL: unknown table ghost");
    let err = output.ensure_generated().unwrap_err();
    assert_eq!(err.to_string(), "SQL generation failed: unknown table ghost");

    let history = commands::sql_history(&state, Some("warehouse"), 10).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn suggest_command_needs_two_distinct_tables() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;

    let err = commands::suggest_joins(&state, "warehouse", &["orders".into()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("at least two distinct tables"));

    let repeated = ["orders".to_string(), "orders".to_string()];
    assert!(commands::suggest_joins(&state, "warehouse", &repeated).await.is_err());
}

#[tokio::test]
async fn ask_command_remembers_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir).await;

    let sql = commands::generate_sql(&state, "warehouse", "how many orders")
        .await
        .unwrap();
    assert_eq!(sql, "SELECT count(*) FROM public.orders");

    let prompts = commands::search_prompts(&state, "orders", 5).await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].generated_sql, sql);

    let recent = state.local_db.recent_connections(5).await.unwrap();
    assert_eq!(recent[0].id, "warehouse");

    assert!(commands::generate_sql(&state, "warehouse", "   ").await.is_err());
}
