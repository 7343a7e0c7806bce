use crate::config::DatabaseConfig;
use crate::domain::ports::DocumentStore;
use crate::utils::error::truncate_chars;
use serde::Serialize;

pub const MAX_REPORTED_COLLECTIONS: usize = 10;
const HEALTH_DETAIL_LIMIT: usize = 50;

/// Reachability of the document store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatabaseHealth {
    Unavailable,
    Connected {
        name: String,
        collections: Vec<String>,
    },
    Error {
        detail: String,
    },
}

/// Body of `GET /test`.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub backend: String,
    pub database: DatabaseHealth,
    pub database_url_set: bool,
    pub database_name_set: bool,
}

pub async fn check_database(store: Option<&dyn DocumentStore>) -> DatabaseHealth {
    let Some(store) = store else {
        return DatabaseHealth::Unavailable;
    };

    match store.list_collections(MAX_REPORTED_COLLECTIONS).await {
        Ok(collections) => DatabaseHealth::Connected {
            name: store.name().to_string(),
            collections,
        },
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            DatabaseHealth::Error {
                detail: truncate_chars(&e.to_string(), HEALTH_DETAIL_LIMIT),
            }
        }
    }
}

pub async fn diagnostics(
    store: Option<&dyn DocumentStore>,
    database: &DatabaseConfig,
) -> DiagnosticsReport {
    DiagnosticsReport {
        backend: "running".to_string(),
        database: check_database(store).await,
        database_url_set: database.url.is_some(),
        database_name_set: database.name.is_some(),
    }
}
