use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection that analysis records are written to.
pub const COIN_ANALYSIS_COLLECTION: &str = "coinanalysis";

/// The eleven keys the vision model is asked to emit.
pub const COIN_FIELDS: [&str; 11] = [
    "name",
    "country",
    "year",
    "denomination",
    "composition",
    "mint_mark",
    "history",
    "features",
    "condition_estimate",
    "estimated_value",
    "confidence",
];

/// Normalized result of one coin image analysis.
///
/// Built once from the model reply, persisted, and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinAnalysisRecord {
    /// Original uploaded file name
    pub filename: Option<String>,
    /// Coin name or type, e.g. "Lincoln Wheat Cent"
    pub name: Option<String>,
    /// Country or region of origin
    pub country: Option<String>,
    /// Year or date range visible/estimated
    pub year: Option<String>,
    /// Face value
    pub denomination: Option<String>,
    /// Metal composition
    pub composition: Option<String>,
    pub mint_mark: Option<String>,
    /// Historical background and significance
    pub history: Option<String>,
    /// Key identifying features
    pub features: Option<String>,
    pub condition_estimate: Option<String>,
    /// Estimated value range in USD or local currency
    pub estimated_value: Option<String>,
    /// Confidence score between 0 and 1
    pub confidence: Option<f64>,
    /// Model that produced the analysis
    pub model: Option<String>,
    /// Reply exactly as the model returned it
    pub raw_analysis: Option<Map<String, Value>>,
}

/// Envelope returned by `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub id: String,
    pub data: CoinAnalysisRecord,
}

/// An uploaded image as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// MIME type placed into the data URI; non-image declarations fall back to JPEG.
    pub fn mime_type(&self) -> &str {
        match self.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => ct,
            _ => "image/jpeg",
        }
    }
}
