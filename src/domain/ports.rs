use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A multimodal model that describes a coin image as a loose JSON object.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Model identifier recorded on every analysis this analyzer produces.
    fn model(&self) -> &str;

    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Map<String, Value>>;
}

/// Document storage used to persist analysis records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Logical database name shown by diagnostics.
    fn name(&self) -> &str;

    /// Inserts `document` into `collection` and returns the assigned id.
    async fn create_document(&self, collection: &str, document: Value) -> Result<String>;

    async fn fetch_document(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    async fn list_collections(&self, limit: usize) -> Result<Vec<String>>;
}
