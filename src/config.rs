use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for cistat.
///
/// Lets users keep connection settings out of the command line. Values
/// given as flags or environment variables always win over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// CI platform connection settings
    #[serde(default)]
    pub buildkite: BuildkiteConfig,

    /// Metric export settings
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildkiteConfig {
    /// API access token
    pub token: Option<String>,

    /// Organization slug
    pub org: Option<String>,

    /// REST API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Only count builds and agents on this queue
    pub queue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExportConfig {
    /// Namespace prefixed to every metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// StatsD host to send gauges to
    #[serde(default = "default_statsd_host")]
    pub statsd_host: String,
}

impl Default for BuildkiteConfig {
    fn default() -> Self {
        Self {
            token: None,
            org: None,
            endpoint: default_endpoint(),
            queue: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            statsd_host: default_statsd_host(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.buildkite.com".to_string()
}

fn default_namespace() -> String {
    "cistat".to_string()
}

fn default_statsd_host() -> String {
    "127.0.0.1:8125".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches in this order:
    /// 1. Specified path
    /// 2. ./cistat.toml
    /// 3. <config dir>/cistat/config.toml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let mut candidates = vec![PathBuf::from("cistat.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("cistat").join("config.toml"));
        }

        for candidate in &candidates {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.buildkite.endpoint, "https://api.buildkite.com");
        assert_eq!(config.buildkite.token, None);
        assert_eq!(config.export.namespace, "cistat");
        assert_eq!(config.export.statsd_host, "127.0.0.1:8125");
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[buildkite]
token = "bkua-test-token"
org = "acme"
queue = "deploy"

[export]
namespace = "ci"
statsd-host = "statsd.internal:8125"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.buildkite.token, Some("bkua-test-token".to_string()));
        assert_eq!(config.buildkite.org, Some("acme".to_string()));
        assert_eq!(config.buildkite.queue, Some("deploy".to_string()));
        assert_eq!(config.buildkite.endpoint, "https://api.buildkite.com");
        assert_eq!(config.export.namespace, "ci");
        assert_eq!(config.export.statsd_host, "statsd.internal:8125");
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[buildkite]\norg = \"acme\"\n").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.buildkite.org, Some("acme".to_string()));
        assert_eq!(config.export.namespace, "cistat");
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let result = Config::load(Some(Path::new("nonexistent-cistat.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "not a toml file [").unwrap();

        let result = Config::load_from_path(temp_file.path());
        assert!(result.is_err());
    }
}
