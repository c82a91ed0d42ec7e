use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level startup configuration, read from the JSON file named on the
/// command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub listen: ListenConfig,
}

/// Which log categories are emitted, and how lines are decorated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Comma-separated category names, e.g. `"listen,path,sql,error"`.
    #[serde(default)]
    pub categories: String,

    /// Fixed prefix for each line. Accepted for compatibility with older
    /// config files; the tracing formatter does not use it.
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub timestamp: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12369
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenConfig {
    /// The `host:port` spec the HTTP listener binds to.
    pub fn hostspec(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    let cfg: ServerConfig = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse config file '{}'", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{
                "logging": {"categories": "listen,sql,error", "prefix": "", "timestamp": false},
                "listen": {"host": "0.0.0.0", "port": 12369}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.logging.categories, "listen,sql,error");
        assert!(!cfg.logging.timestamp);
        assert_eq!(cfg.listen.hostspec(), "0.0.0.0:12369");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let cfg: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.logging.categories, "");
        assert_eq!(cfg.listen.host, "0.0.0.0");
        assert_eq!(cfg.listen.port, 12369);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/no/such/config.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read config file"));
    }

    #[test]
    fn test_load_config_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("cannot parse config file"));
    }
}
