#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 服務完整配置：預設值 < TOML 檔案 < 環境變數 < 命令列參數
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub vision: VisionConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
        }
    }
}

// 金鑰不可出現在日誌中
impl fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl VisionConfig {
    /// Chat completions endpoint derived from the configured base URL.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub name: Option<String>,
}

impl DatabaseConfig {
    /// SQLite location behind `url`, with any `sqlite://` or `sqlite:` scheme removed.
    pub fn sqlite_path(&self) -> Option<&str> {
        let url = self.url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(
            url.strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))
                .unwrap_or(url),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServiceConfig {
    /// 載入配置：可選的 TOML 檔案，再套用環境變數
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => toml_config::from_file(path)?,
            None => ServiceConfig::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// 以環境變數覆寫配置 (lookup 方便測試注入)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = non_empty(lookup("HOST")) {
            self.server.host = host;
        }
        if let Some(port) = non_empty(lookup("PORT")) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(limit) = non_empty(lookup("MAX_UPLOAD_BYTES")) {
            match limit.parse() {
                Ok(limit) => self.server.max_upload_bytes = limit,
                Err(_) => tracing::warn!("Ignoring invalid MAX_UPLOAD_BYTES value: {}", limit),
            }
        }

        if let Some(key) = non_empty(lookup("OPENAI_API_KEY")) {
            self.vision.api_key = Some(key);
        }
        if let Some(base) = non_empty(lookup("OPENAI_API_BASE")) {
            self.vision.api_base = base;
        }
        if let Some(model) = non_empty(lookup("OPENAI_MODEL")) {
            self.vision.model = model;
        }

        if let Some(url) = non_empty(lookup("DATABASE_URL")) {
            self.database.url = Some(url);
        }
        if let Some(name) = non_empty(lookup("DATABASE_NAME")) {
            self.database.name = Some(name);
        }

        if let Some(origins) = non_empty(lookup("CORS_ALLOW_ORIGINS")) {
            self.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_positive_number("server.port", self.server.port as usize, 1)?;
        validate_positive_number("server.max_upload_bytes", self.server.max_upload_bytes, 1)?;

        validate_url("vision.api_base", &self.vision.api_base)?;
        validate_non_empty_string("vision.model", &self.vision.model)?;
        validate_range("vision.temperature", self.vision.temperature, 0.0, 2.0)?;

        validate_positive_number("cors.allowed_origins", self.cors.allowed_origins.len(), 1)?;
        for origin in &self.cors.allowed_origins {
            validate_non_empty_string("cors.allowed_origins", origin)?;
            if origin != "*" {
                validate_url("cors.allowed_origins", origin)?;
            }
        }

        if self.vision.api_key.is_none() {
            tracing::warn!("⚠️  OPENAI_API_KEY is not set; analyze requests will fail");
        }

        tracing::debug!("✅ Service configuration validation passed");
        Ok(())
    }
}
