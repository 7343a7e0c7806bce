pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod storage;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::ServiceConfig;
pub use core::{analysis::AnalysisService, vision_client::OpenAiVisionClient};
pub use domain::model::{AnalyzeResponse, CoinAnalysisRecord};
pub use server::{build_router, AppState};
pub use storage::SqliteDocumentStore;
pub use utils::error::{CoinError, Result};
