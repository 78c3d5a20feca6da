use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, loadable from TOML. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Deadline applied to every request's store work.
    pub request_timeout_secs: u64,
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Reject malformed arguments before they reach storage.
    pub validate: bool,
    /// Open a span per store operation.
    pub trace: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout_secs: 60,
            log_level: "info".to_string(),
            validate: true,
            trace: true,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fail on settings that parse but cannot work.
    pub fn check(&self) -> ServerResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(ServerError::Config(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ServerError::Config("log_level must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.request_timeout(), Duration::from_secs(60));
        assert_eq!(c.log_level, "info");
        assert!(c.validate && c.trace);
        c.check().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml("bind_addr = \"0.0.0.0:9000\"\ntrace = false\n").unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert!(!c.trace);
        assert!(c.validate);
        assert_eq!(c.request_timeout_secs, 60);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = 5").unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.request_timeout(), Duration::from_secs(5));
        assert_eq!(c.log_level, "debug");
    }

    #[test]
    fn load_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = 42").unwrap();
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ServerConfig::load(dir.path().join("absent.toml")),
            Err(ServerError::Io(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let c = ServerConfig {
            validate: false,
            ..Default::default()
        };
        let text = c.to_toml().unwrap();
        assert_eq!(ServerConfig::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn zero_timeout_rejected() {
        let c = ServerConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(c.check().is_err());
    }
}
