use crate::core::normalizer::{normalize, validate_record};
use crate::domain::model::{AnalyzeResponse, ImageUpload, COIN_ANALYSIS_COLLECTION};
use crate::domain::ports::{DocumentStore, VisionAnalyzer};
use crate::utils::error::{CoinError, Result};
use std::sync::Arc;

/// Runs one upload through the vision model, normalizes the reply and stores it.
pub struct AnalysisService {
    analyzer: Arc<dyn VisionAnalyzer>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl AnalysisService {
    pub fn new(analyzer: Arc<dyn VisionAnalyzer>, store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self { analyzer, store }
    }

    pub fn store(&self) -> Option<&dyn DocumentStore> {
        self.store.as_deref()
    }

    pub async fn analyze(&self, upload: ImageUpload) -> Result<AnalyzeResponse> {
        if upload.bytes.is_empty() {
            return Err(CoinError::empty_upload());
        }

        tracing::info!(
            filename = upload.filename.as_deref().unwrap_or("<unnamed>"),
            bytes = upload.bytes.len(),
            "Analyzing coin image"
        );

        // 呼叫視覺模型
        let reply = self
            .analyzer
            .analyze_image(&upload.bytes, upload.mime_type())
            .await?;
        tracing::debug!("Vision model returned {} keys", reply.len());

        // 正規化為固定欄位
        let record = normalize(&reply, upload.filename.as_deref(), self.analyzer.model());
        validate_record(&record)?;

        // 寫入資料庫
        let store = self.store.as_ref().ok_or(CoinError::StorageUnavailable)?;
        let document = serde_json::to_value(&record)?;
        let id = store
            .create_document(COIN_ANALYSIS_COLLECTION, document)
            .await?;

        tracing::info!("✅ Stored coin analysis {}", id);
        Ok(AnalyzeResponse { id, data: record })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SqliteDocumentStore;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedAnalyzer {
        reply: Value,
        calls: AtomicUsize,
    }

    impl CannedAnalyzer {
        fn new(reply: Value) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VisionAnalyzer for CannedAnalyzer {
        fn model(&self) -> &str {
            "test-vision-model"
        }

        async fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> Result<Map<String, Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(CoinError::upstream_protocol("not an object")),
            }
        }
    }

    fn upload(bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            filename: Some("coin.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_analyze_persists_record() {
        let analyzer = Arc::new(CannedAnalyzer::new(json!({
            "name": "Lincoln Wheat Cent",
            "country": "USA",
            "confidence": 0.87
        })));
        let store = Arc::new(SqliteDocumentStore::in_memory("test").unwrap());
        let service = AnalysisService::new(analyzer.clone(), Some(store.clone()));

        let response = service.analyze(upload(b"jpeg")).await.unwrap();

        assert!(!response.id.is_empty());
        assert_eq!(response.data.name.as_deref(), Some("Lincoln Wheat Cent"));
        assert_eq!(response.data.country.as_deref(), Some("USA"));
        assert_eq!(response.data.confidence, Some(0.87));
        assert!(response.data.year.is_none());
        assert_eq!(response.data.model.as_deref(), Some("test-vision-model"));
        assert_eq!(response.data.filename.as_deref(), Some("coin.jpg"));

        let stored = store
            .fetch_document(COIN_ANALYSIS_COLLECTION, &response.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["name"], "Lincoln Wheat Cent");
        assert_eq!(stored["raw_analysis"]["confidence"], 0.87);
    }

    #[tokio::test]
    async fn test_empty_upload_skips_vision_call() {
        let analyzer = Arc::new(CannedAnalyzer::new(json!({})));
        let service = AnalysisService::new(analyzer.clone(), None);

        let err = service.analyze(upload(b"")).await.unwrap_err();

        assert!(matches!(err, CoinError::InvalidUploadError { .. }));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_store_is_reported() {
        let analyzer = Arc::new(CannedAnalyzer::new(json!({ "name": "Penny" })));
        let service = AnalysisService::new(analyzer, None);

        let err = service.analyze(upload(b"jpeg")).await.unwrap_err();
        assert!(matches!(err, CoinError::StorageUnavailable));
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_rejected_before_storage() {
        let analyzer = Arc::new(CannedAnalyzer::new(json!({ "confidence": 87 })));
        let store = Arc::new(SqliteDocumentStore::in_memory("test").unwrap());
        let service = AnalysisService::new(analyzer, Some(store.clone()));

        let err = service.analyze(upload(b"jpeg")).await.unwrap_err();

        assert!(matches!(err, CoinError::InvalidRecordError { .. }));
        assert!(store.list_collections(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_boundary_confidence_is_accepted() {
        for confidence in [0.0, 1.0] {
            let analyzer = Arc::new(CannedAnalyzer::new(json!({ "confidence": confidence })));
            let store = Arc::new(SqliteDocumentStore::in_memory("test").unwrap());
            let service = AnalysisService::new(analyzer, Some(store));

            let response = service.analyze(upload(b"jpeg")).await.unwrap();
            assert_eq!(response.data.confidence, Some(confidence));
        }
    }

    #[tokio::test]
    async fn test_upstream_errors_pass_through() {
        let analyzer = Arc::new(CannedAnalyzer::new(json!("not an object")));
        let service = AnalysisService::new(analyzer, None);

        let err = service.analyze(upload(b"jpeg")).await.unwrap_err();
        assert!(err.is_upstream());
    }
}
