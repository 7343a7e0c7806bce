pub mod analysis;
pub mod health;
pub mod normalizer;
pub mod vision_client;

pub use crate::domain::model::{AnalyzeResponse, CoinAnalysisRecord, ImageUpload};
pub use crate::domain::ports::{DocumentStore, VisionAnalyzer};
pub use crate::utils::error::Result;
