use axum::http::StatusCode;
use thiserror::Error;

/// Upstream error bodies are cut to this many characters before they reach a caller.
pub const UPSTREAM_BODY_LIMIT: usize = 300;
/// Protocol and transport failure details are cut to this many characters.
pub const UPSTREAM_DETAIL_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum CoinError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Vision API error: {body}")]
    UpstreamHttpError { status: u16, body: String },

    #[error("Error calling vision API: {message}")]
    UpstreamProtocolError { message: String },

    #[error("Invalid upload: {message}")]
    InvalidUploadError { status: u16, message: String },

    #[error("Invalid analysis record: {message}")]
    InvalidRecordError { message: String },

    #[error("Database not available. Check DATABASE_URL and DATABASE_NAME environment variables")]
    StorageUnavailable,

    #[error("Database error: {0}")]
    StorageError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoinError {
    pub fn upstream_http(status: u16, body: &str) -> Self {
        CoinError::UpstreamHttpError {
            status,
            body: truncate_chars(body, UPSTREAM_BODY_LIMIT),
        }
    }

    pub fn upstream_protocol(message: impl AsRef<str>) -> Self {
        CoinError::UpstreamProtocolError {
            message: truncate_chars(message.as_ref(), UPSTREAM_DETAIL_LIMIT),
        }
    }

    pub fn missing_upload_field(field: &str) -> Self {
        CoinError::InvalidUploadError {
            status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
            message: format!("Missing multipart field '{}'", field),
        }
    }

    pub fn empty_upload() -> Self {
        CoinError::InvalidUploadError {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: "Uploaded file is empty".to_string(),
        }
    }

    pub fn upload_too_large(limit: usize) -> Self {
        CoinError::InvalidUploadError {
            status: StatusCode::PAYLOAD_TOO_LARGE.as_u16(),
            message: format!("Upload exceeds the {} byte limit", limit),
        }
    }

    /// HTTP status this error maps to at the service boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoinError::UpstreamHttpError { .. } => StatusCode::BAD_GATEWAY,
            CoinError::InvalidUploadError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human readable text placed in the `detail` field of error responses.
    pub fn detail(&self) -> String {
        match self {
            // 缺少憑證時只回報變數名稱
            CoinError::ConfigError { message } => message.clone(),
            CoinError::InternalError { message } => message.clone(),
            CoinError::InvalidUploadError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for failures raised by the vision client step.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoinError::UpstreamHttpError { .. } | CoinError::UpstreamProtocolError { .. }
        )
    }
}

/// Keeps at most `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub type Result<T> = std::result::Result<T, CoinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_limit() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_chars_counts_characters_not_bytes() {
        let text = "硬幣硬幣硬幣";
        let truncated = truncate_chars(text, 4);
        assert_eq!(truncated, "硬幣硬幣");
        assert_eq!(truncated.chars().count(), 4);
    }

    #[test]
    fn test_upstream_http_body_is_truncated() {
        let body = "x".repeat(1000);
        let err = CoinError::upstream_http(429, &body);
        match &err {
            CoinError::UpstreamHttpError { status, body } => {
                assert_eq!(*status, 429);
                assert_eq!(body.chars().count(), UPSTREAM_BODY_LIMIT);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.detail().starts_with("Vision API error: "));
    }

    #[test]
    fn test_upstream_protocol_detail_is_truncated() {
        let err = CoinError::upstream_protocol("y".repeat(500));
        match &err {
            CoinError::UpstreamProtocolError { message } => {
                assert_eq!(message.chars().count(), UPSTREAM_DETAIL_LIMIT)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        let config = CoinError::ConfigError {
            message: "OPENAI_API_KEY not configured".to_string(),
        };
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(config.detail(), "OPENAI_API_KEY not configured");

        assert_eq!(
            CoinError::empty_upload().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoinError::missing_upload_field("file").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let too_large = CoinError::upload_too_large(1024);
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.detail(), "Upload exceeds the 1024 byte limit");
        assert_eq!(
            CoinError::StorageUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_is_upstream() {
        assert!(CoinError::upstream_http(500, "boom").is_upstream());
        assert!(CoinError::upstream_protocol("bad json").is_upstream());
        assert!(!CoinError::StorageUnavailable.is_upstream());
    }
}
