//! HTTP boundary: routing, CORS, upload limits and request tracing.

pub mod error;
pub mod handlers;

use crate::config::{CorsConfig, DatabaseConfig, ServiceConfig};
use crate::core::analysis::AnalysisService;
use crate::core::vision_client::OpenAiVisionClient;
use crate::domain::ports::DocumentStore;
use crate::storage::SqliteDocumentStore;
use crate::utils::error::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub database: DatabaseConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        analysis: AnalysisService,
        database: DatabaseConfig,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            analysis: Arc::new(analysis),
            database,
            max_upload_bytes,
        }
    }

    /// Wires the vision client and, when `DATABASE_URL` is set, the SQLite store.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let analyzer = Arc::new(OpenAiVisionClient::new(&config.vision)?);
        let store = open_store(&config.database);
        Ok(Self::new(
            AnalysisService::new(analyzer, store),
            config.database.clone(),
            config.server.max_upload_bytes,
        ))
    }
}

fn open_store(database: &DatabaseConfig) -> Option<Arc<dyn DocumentStore>> {
    let path = database.sqlite_path()?;
    match SqliteDocumentStore::from_config(path, database.name.as_deref()) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            // 資料庫無法開啟時仍啟動服務，/test 會回報不可用
            tracing::error!("❌ Failed to open database at {}: {}", path, e);
            None
        }
    }
}

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the Axum router with all routes and layers.
pub fn build_router(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/test", get(handlers::test_database))
        .route("/api/analyze", post(handlers::analyze))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🚀 Coin identifier listening on {}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
