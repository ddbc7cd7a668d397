use crate::{
    error::{CoreError, Result},
    procfs::DEFAULT_PROC_ROOT,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen_addr: String,

    /// HTTP port
    pub port: u16,

    /// Path serving the text exposition
    pub metrics_path: String,

    /// Root of the proc filesystem
    pub proc_root: PathBuf,

    /// Collections slower than this are logged as warnings
    pub collect_budget_ms: u64,

    /// Default tracing filter, used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            collect_budget_ms: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in order of preference:
    /// 1. CLI arguments override everything
    /// 2. `PORT` environment variable
    /// 3. JSON config file if specified
    /// 4. Default config file locations
    /// 5. Built-in defaults
    pub fn load(
        cli_config: Option<&CliConfig>,
        json_path: Option<&PathBuf>,
        env_port: Option<&str>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(default_config) = Self::load_default_config()? {
            config.merge(default_config);
        }

        if let Some(path) = json_path {
            let file_config = Self::load_from_file(path)?;
            config.merge(file_config);
        }

        if let Some(port) = parse_port_env(env_port)? {
            config.port = port;
        }

        if let Some(cli) = cli_config {
            config.apply_cli_overrides(cli);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific JSON file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            CoreError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    fn load_default_config() -> Result<Option<Self>> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(Some(config)),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping config file");
                        continue;
                    }
                }
            }
        }

        Ok(None)
    }

    /// Get default configuration file search paths
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("nodestat").join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".nodestat.json"));
        }

        paths.push(PathBuf::from("nodestat.json"));

        paths
    }

    /// Merge another configuration into this one; only values that differ
    /// from the built-in defaults take effect.
    fn merge(&mut self, other: Self) {
        let defaults = Self::default();
        if other.listen_addr != defaults.listen_addr {
            self.listen_addr = other.listen_addr;
        }
        if other.port != defaults.port {
            self.port = other.port;
        }
        if other.metrics_path != defaults.metrics_path {
            self.metrics_path = other.metrics_path;
        }
        if other.proc_root != defaults.proc_root {
            self.proc_root = other.proc_root;
        }
        if other.collect_budget_ms != defaults.collect_budget_ms {
            self.collect_budget_ms = other.collect_budget_ms;
        }
        if other.log_filter != defaults.log_filter {
            self.log_filter = other.log_filter;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &CliConfig) {
        if let Some(addr) = &cli.listen_addr {
            self.listen_addr = addr.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(path) = &cli.metrics_path {
            self.metrics_path = path.clone();
        }
        if let Some(root) = &cli.proc_root {
            self.proc_root = root.clone();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(CoreError::config("Port must be between 1 and 65535"));
        }

        if !self.metrics_path.starts_with('/') || self.metrics_path == "/" {
            return Err(CoreError::config(format!(
                "Metrics path must start with '/' and not be the root, got {:?}",
                self.metrics_path
            )));
        }

        if self.proc_root.as_os_str().is_empty() {
            return Err(CoreError::config("Proc root must not be empty"));
        }

        if !(1..=60_000).contains(&self.collect_budget_ms) {
            return Err(CoreError::config(
                "Collection budget must be between 1ms and 60 seconds",
            ));
        }

        Ok(())
    }

    pub fn collect_budget(&self) -> Duration {
        Duration::from_millis(self.collect_budget_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

/// Parse the value of the `PORT` environment variable. Unset or empty means no override.
pub fn parse_port_env(value: Option<&str>) -> Result<Option<u16>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<u16>()
            .map(Some)
            .map_err(|e| CoreError::config(format!("Invalid PORT {raw:?}: {e}"))),
    }
}

/// CLI configuration (temporary struct for CLI parsing)
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub listen_addr: Option<String>,
    pub port: Option<u16>,
    pub metrics_path: Option<String>,
    pub proc_root: Option<PathBuf>,
}
