use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create data directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Local history and recall store. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct LocalDb {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlHistoryEntry {
    pub id: i64,
    pub connection_id: String,
    pub sql: String,
    pub complexity: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPromptEntry {
    pub prompt: String,
    pub generated_sql: String,
    pub use_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentConnection {
    pub id: String,
    pub name: String,
    pub last_used: String,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sql_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection_id TEXT NOT NULL,
        sql TEXT NOT NULL,
        complexity TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE IF NOT EXISTS ai_prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt TEXT NOT NULL UNIQUE,
        generated_sql TEXT NOT NULL DEFAULT '',
        use_count INTEGER NOT NULL DEFAULT 1,
        last_used TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE IF NOT EXISTS recent_connections (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        seq INTEGER NOT NULL,
        last_used TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_history_connection ON sql_history(connection_id);
    CREATE INDEX IF NOT EXISTS idx_history_created ON sql_history(created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_ai_prompts_use ON ai_prompts(use_count DESC);
";

impl LocalDb {
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened local store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn add_sql_history(
        &self,
        connection_id: &str,
        sql: &str,
        complexity: Option<&str>,
    ) -> StorageResult<i64> {
        let db = self.conn.lock().await;
        db.execute(
            "INSERT INTO sql_history (connection_id, sql, complexity) VALUES (?1, ?2, ?3)",
            rusqlite::params![connection_id, sql, complexity],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Newest first. `connection_id = None` returns history for every
    /// connection.
    pub async fn get_sql_history(
        &self,
        connection_id: Option<&str>,
        limit: i64,
    ) -> StorageResult<Vec<SqlHistoryEntry>> {
        let db = self.conn.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, connection_id, sql, complexity, created_at
             FROM sql_history
             WHERE ?1 IS NULL OR connection_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![connection_id, limit], |row| {
            Ok(SqlHistoryEntry {
                id: row.get(0)?,
                connection_id: row.get(1)?,
                sql: row.get(2)?,
                complexity: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Record a prompt. Repeating a prompt bumps its count and replaces the
    /// stored SQL.
    pub async fn save_ai_prompt(&self, prompt: &str, generated_sql: &str) -> StorageResult<()> {
        let db = self.conn.lock().await;
        db.execute(
            "INSERT INTO ai_prompts (prompt, generated_sql) VALUES (?1, ?2)
             ON CONFLICT(prompt) DO UPDATE SET use_count = use_count + 1,
                last_used = strftime('%Y-%m-%d %H:%M:%f', 'now'), generated_sql = ?2",
            rusqlite::params![prompt, generated_sql],
        )?;
        Ok(())
    }

    pub async fn search_ai_prompts(&self, query: &str, limit: i64) -> StorageResult<Vec<AiPromptEntry>> {
        let db = self.conn.lock().await;
        let pattern = format!("%{}%", query);
        let mut stmt = db.prepare(
            "SELECT prompt, generated_sql, use_count FROM ai_prompts
             WHERE prompt LIKE ?1
             ORDER BY use_count DESC, last_used DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![pattern, limit], |row| {
            Ok(AiPromptEntry {
                prompt: row.get(0)?,
                generated_sql: row.get(1)?,
                use_count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub async fn touch_connection(&self, id: &str, name: &str) -> StorageResult<()> {
        let db = self.conn.lock().await;
        db.execute(
            "INSERT INTO recent_connections (id, name, seq)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM recent_connections))
             ON CONFLICT(id) DO UPDATE SET name = ?2, seq = excluded.seq,
                last_used = strftime('%Y-%m-%d %H:%M:%f', 'now')",
            rusqlite::params![id, name],
        )?;
        Ok(())
    }

    pub async fn recent_connections(&self, limit: i64) -> StorageResult<Vec<RecentConnection>> {
        let db = self.conn.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, name, last_used FROM recent_connections
             ORDER BY seq DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit], |row| {
            Ok(RecentConnection {
                id: row.get(0)?,
                name: row.get(1)?,
                last_used: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_is_newest_first_and_filtered() {
        let db = LocalDb::open_in_memory().unwrap();
        db.add_sql_history("c1", "SELECT 1", Some("Simple")).await.unwrap();
        db.add_sql_history("c2", "SELECT 2", None).await.unwrap();
        db.add_sql_history("c1", "SELECT 3", None).await.unwrap();

        let c1 = db.get_sql_history(Some("c1"), 10).await.unwrap();
        assert_eq!(c1.len(), 2);
        assert_eq!(c1[0].sql, "SELECT 3");
        assert_eq!(c1[1].complexity.as_deref(), Some("Simple"));

        let all = db.get_sql_history(None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sql, "SELECT 3");
    }

    #[tokio::test]
    async fn test_prompt_upsert_and_search() {
        let db = LocalDb::open_in_memory().unwrap();
        db.save_ai_prompt("top customers", "SELECT 1").await.unwrap();
        db.save_ai_prompt("monthly revenue", "SELECT 2").await.unwrap();
        db.save_ai_prompt("top customers", "SELECT 3").await.unwrap();

        let hits = db.search_ai_prompts("top", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].use_count, 2);
        assert_eq!(hits[0].generated_sql, "SELECT 3");

        let all = db.search_ai_prompts("", 10).await.unwrap();
        assert_eq!(all[0].prompt, "top customers");
    }

    #[tokio::test]
    async fn test_recent_connections() {
        let db = LocalDb::open_in_memory().unwrap();
        db.touch_connection("a", "Warehouse").await.unwrap();
        db.touch_connection("b", "CRM").await.unwrap();
        db.touch_connection("a", "Warehouse (prod)").await.unwrap();

        let recent = db.recent_connections(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "a");
        assert_eq!(recent[0].name, "Warehouse (prod)");
    }
}
