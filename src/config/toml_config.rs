use crate::config::ServiceConfig;
use crate::utils::error::{CoinError, Result};
use regex::Regex;
use std::path::Path;

/// 從 TOML 檔案載入配置
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(&path).map_err(CoinError::IoError)?;
    tracing::debug!("Loaded config file: {}", path.as_ref().display());
    from_toml_str(&content)
}

/// 從 TOML 字串解析配置
pub fn from_toml_str(content: &str) -> Result<ServiceConfig> {
    let processed_content = substitute_env_vars(content)?;

    toml::from_str(&processed_content).map_err(|e| CoinError::ConfigError {
        message: format!("TOML parsing error: {}", e),
    })
}

/// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定的變數保留原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CoinError::InternalError {
        message: format!("Invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 9000
max_upload_bytes = 2048

[vision]
api_base = "https://llm.example.com/v1"
model = "gpt-4o"
temperature = 0.5

[database]
url = "sqlite://./coins.db"
name = "coins"

[cors]
allowed_origins = ["https://app.example.com"]
"#;

        let config = from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_upload_bytes, 2048);
        assert_eq!(config.vision.model, "gpt-4o");
        assert_eq!(config.vision.temperature, 0.5);
        assert_eq!(config.database.sqlite_path(), Some("./coins.db"));
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = from_toml_str("[server]\nport = 8123\n").unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.vision.model, "gpt-4o-mini");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COIN_TEST_API_BASE", "https://test.api.com/v1");

        let toml_content = r#"
[vision]
api_base = "${COIN_TEST_API_BASE}"
"#;

        let config = from_toml_str(toml_content).unwrap();
        assert_eq!(config.vision.api_base, "https://test.api.com/v1");

        std::env::remove_var("COIN_TEST_API_BASE");
    }

    #[test]
    fn test_unset_env_var_is_left_in_place() {
        let toml_content = r#"
[vision]
api_base = "${COIN_TEST_UNSET_VARIABLE}"
"#;

        let config = from_toml_str(toml_content).unwrap();
        assert_eq!(config.vision.api_base, "${COIN_TEST_UNSET_VARIABLE}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(CoinError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[database]\nname = \"file-test\"\n")
            .unwrap();

        let config = from_file(temp_file.path()).unwrap();
        assert_eq!(config.database.name.as_deref(), Some("file-test"));
    }
}
