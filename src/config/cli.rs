use crate::config::ServiceConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "coin-identifier")]
#[command(about = "HTTP service that identifies coins from uploaded images")]
#[command(version)]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Address to bind (overrides HOST)")]
    pub host: Option<String>,

    #[arg(short, long, help = "Port to listen on (overrides PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 合併檔案、環境變數與命令列參數
    pub fn into_service_config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_flags() {
        let cli = CliConfig::parse_from(["coin-identifier", "--port", "9100", "--verbose"]);
        assert_eq!(cli.port, Some(9100));
        assert!(cli.verbose);
        assert!(!cli.json_logs);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nhost = \"10.0.0.1\"\nport = 7000\n")
            .unwrap();

        let path = temp_file.path().to_str().unwrap().to_string();
        let cli = CliConfig::parse_from([
            "coin-identifier",
            "--config",
            path.as_str(),
            "--host",
            "127.0.0.1",
        ]);

        let config = cli.into_service_config().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
