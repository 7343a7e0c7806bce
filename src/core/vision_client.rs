use crate::config::{VisionConfig, DEFAULT_TIMEOUT_SECONDS};
use crate::domain::ports::VisionAnalyzer;
use crate::utils::error::{CoinError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const SYSTEM_PROMPT: &str = "You are a numismatics expert. Analyze the provided coin image and return a concise, structured JSON with fields: name, country, year, denomination, composition, mint_mark, history, features, condition_estimate, estimated_value, confidence (0-1). If uncertain, include best estimates and say 'Unknown' where needed.";

pub const USER_PROMPT: &str = "Please analyze this coin and extract detailed information.";

/// Chat-completions client for an OpenAI compatible vision model.
pub struct OpenAiVisionClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OpenAiVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        // 固定逾時，不重試
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECONDS);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoinError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request body sent to the completions endpoint for one image.
    pub fn build_payload(&self, image: &[u8], mime_type: &str) -> Value {
        let data_uri = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));

        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        { "type": "image_url", "image_url": { "url": data_uri } }
                    ]
                }
            ],
            "response_format": { "type": "json_object" }
        })
    }
}

/// Pulls `choices[0].message.content` out of a completion body and parses it as a JSON object.
pub fn parse_completion(body: &str) -> Result<Map<String, Value>> {
    let completion: Value = serde_json::from_str(body)
        .map_err(|e| CoinError::upstream_protocol(format!("invalid response body: {}", e)))?;

    let content = completion
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            CoinError::upstream_protocol("response is missing choices[0].message.content")
        })?;

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CoinError::upstream_protocol(format!(
            "expected a JSON object in message content, got: {}",
            other
        ))),
        Err(e) => Err(CoinError::upstream_protocol(format!(
            "message content is not valid JSON: {}",
            e
        ))),
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAiVisionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Map<String, Value>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| CoinError::ConfigError {
            message: "OPENAI_API_KEY not configured".to_string(),
        })?;

        let payload = self.build_payload(image, mime_type);

        tracing::debug!(
            model = %self.model,
            image_bytes = image.len(),
            timeout_secs = self.timeout.as_secs(),
            "Sending image to vision endpoint: {}",
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoinError::upstream_protocol(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Vision API response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| CoinError::upstream_protocol(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("❌ Vision API rejected request with status {}", status);
            return Err(CoinError::upstream_http(status.as_u16(), &body));
        }

        parse_completion(&body)
    }
}
