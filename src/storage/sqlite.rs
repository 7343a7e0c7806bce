//! SQLite-backed document store.
//!
//! Documents are kept as JSON text in a single `documents` table keyed by a
//! generated UUID, with the collection name stored alongside each row.

use crate::domain::ports::DocumentStore;
use crate::utils::error::{CoinError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,
    data        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);";

pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    name: String,
}

impl SqliteDocumentStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("SqliteDocumentStore opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            name: name.into(),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory(name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            name: name.into(),
        })
    }

    /// Opens the database named by `DATABASE_URL`, falling back to the file stem as name.
    pub fn from_config(path: &str, name: Option<&str>) -> Result<Self> {
        let name = name
            .map(str::to_string)
            .or_else(|| {
                Path::new(path)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "coins".to_string());

        if path == ":memory:" {
            Self::in_memory(name)
        } else {
            Self::open(path, name)
        }
    }

    // rusqlite 為同步 API，查詢放到 blocking 執行緒
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| CoinError::InternalError {
                message: "Database connection lock poisoned".to_string(),
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| CoinError::InternalError {
            message: format!("Database task failed: {}", e),
        })?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_document(&self, collection: &str, document: Value) -> Result<String> {
        let Value::Object(mut fields) = document else {
            return Err(CoinError::InternalError {
                message: format!("Document for '{}' must be a JSON object", collection),
            });
        };

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        fields.insert("created_at".to_string(), Value::String(now.clone()));
        fields.insert("updated_at".to_string(), Value::String(now.clone()));
        let data = serde_json::to_string(&fields)?;

        let row_id = id.clone();
        let row_collection = collection.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO documents (id, collection, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row_id, row_collection, data, now, now],
            )?;
            Ok(())
        })
        .await?;

        tracing::debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    async fn fetch_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collection = collection.to_string();
        let id = id.to_string();
        let data: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn list_collections(&self, limit: usize) -> Result<Vec<String>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT collection FROM documents ORDER BY collection LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;

            let mut collections = Vec::new();
            for row in rows {
                collections.push(row?);
            }
            Ok(collections)
        })
        .await
    }
}
