//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/usercycle/config.toml`. Every
//! setting is optional; the library is usable with nothing but an API key.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/usercycle/` (~/.config/usercycle/)
//! - State/Logs: `$XDG_STATE_HOME/usercycle/` (~/.local/state/usercycle/),
//!   unless `[logging] dir` points elsewhere
//!
//! ```toml
//! api_key = "uc_xxxxxxxxxxxx"
//!
//! [client]
//! host = "api.usercycle.com"
//! log_dir = "/var/spool/usercycle"
//! queue_only = true
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API host
pub const DEFAULT_HOST: &str = "api.usercycle.com";

/// Default API port
pub const DEFAULT_PORT: u16 = 80;

/// API version segment in `/api/v{N}`
pub const API_VERSION: u32 = 1;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-Usercycle-API-Key";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 40;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// API key (the command line takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Client options
    #[serde(default)]
    pub client: ClientOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Caller-supplied client options
///
/// Unset and empty values fall back to defaults when the client is built.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClientOptions {
    /// Directory holding the queue and error logs (default: OS temp dir)
    pub log_dir: Option<PathBuf>,

    /// Never call the API while recording; queue everything for a later drain
    pub queue_only: Option<bool>,

    /// API host, optionally with a scheme (default: `api.usercycle.com`)
    pub host: Option<String>,

    /// API port (default: 80)
    pub port: Option<u16>,

    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_secs: Option<u64>,

    /// Total request timeout in seconds (default: 40)
    pub timeout_secs: Option<u64>,

    /// Mirror error log lines to stderr (default: true)
    pub mirror_to_stderr: Option<bool>,
}

impl ClientOptions {
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_queue_only(mut self, queue_only: bool) -> Self {
        self.queue_only = Some(queue_only);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_mirror_to_stderr(mut self, mirror: bool) -> Self {
        self.mirror_to_stderr = Some(mirror);
        self
    }

    /// Overlay `other` on top of `self`; set values in `other` win
    pub fn merge(self, other: ClientOptions) -> Self {
        Self {
            log_dir: other.log_dir.or(self.log_dir),
            queue_only: other.queue_only.or(self.queue_only),
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            mirror_to_stderr: other.mirror_to_stderr.or(self.mirror_to_stderr),
        }
    }
}

/// Resolved, validated client configuration
///
/// Built once per client and never changed afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: String,
    host: String,
    port: u16,
    log_dir: PathBuf,
    queue_only: bool,
    connect_timeout: Duration,
    timeout: Duration,
    mirror_to_stderr: bool,
}

impl ClientConfig {
    /// Apply defaults to `options` and check that the log directory is writable
    pub fn resolve(api_key: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let log_dir = options
            .log_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(std::env::temp_dir);
        let host = options
            .host
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = options
            .port
            .filter(|port| *port != 0)
            .unwrap_or(DEFAULT_PORT);

        ensure_writable(&log_dir)?;

        Ok(Self {
            api_key: api_key.into(),
            host,
            port,
            log_dir,
            queue_only: options.queue_only.unwrap_or(false),
            connect_timeout: Duration::from_secs(
                options
                    .connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            timeout: Duration::from_secs(options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            mirror_to_stderr: options.mirror_to_stderr.unwrap_or(true),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn queue_only(&self) -> bool {
        self.queue_only
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mirror_to_stderr(&self) -> bool {
        self.mirror_to_stderr
    }

    /// API root, e.g. `http://api.usercycle.com/api/v1`
    ///
    /// The port is only spelled out when it differs from 80. A host that
    /// already carries a scheme keeps it.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let (scheme, host) = host.split_once("://").unwrap_or(("http", host));
        if self.port == DEFAULT_PORT {
            format!("{}://{}/api/v{}", scheme, host, API_VERSION)
        } else {
            format!("{}://{}:{}/api/v{}", scheme, host, self.port, API_VERSION)
        }
    }
}

/// Fail unless `dir` is an existing directory we can create files in
fn ensure_writable(dir: &Path) -> Result<()> {
    let not_writable = || Error::Config(format!("Could not open {} for writing", dir.display()));

    let metadata = fs::metadata(dir).map_err(|_| not_writable())?;
    if !metadata.is_dir() {
        return Err(not_writable());
    }

    let check_file = dir.join(format!(".usercycle-write-check-{}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&check_file)
        .map_err(|_| not_writable())?;
    if let Err(e) = fs::remove_file(&check_file) {
        tracing::warn!(
            file = %check_file.display(),
            error = %e,
            "Failed to remove log directory write-check file"
        );
    }
    Ok(())
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the drain's diagnostic logs (default: state dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Maximum number of daily log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
            max_files: default_max_log_files(),
        }
    }
}

impl LoggingConfig {
    /// Where diagnostic logs are written
    pub fn log_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(Config::state_dir)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    7
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/usercycle/config.toml` (~/.config/usercycle/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("usercycle").join("config.toml")
    }

    /// Returns the state directory path (for diagnostic logs)
    ///
    /// `$XDG_STATE_HOME/usercycle/` (~/.local/state/usercycle/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("usercycle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert!(config.client.host.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_files, 7);
        assert_eq!(config.logging.log_dir(), Config::state_dir());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
api_key = "uc_test"

[client]
host = "collector.internal"
port = 8080
log_dir = "/var/spool/usercycle"
queue_only = true

[logging]
level = "debug"
dir = "/var/log/usercycle"
max_files = 3
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("uc_test"));
        assert_eq!(config.client.host.as_deref(), Some("collector.internal"));
        assert_eq!(config.client.port, Some(8080));
        assert_eq!(
            config.client.log_dir,
            Some(PathBuf::from("/var/spool/usercycle"))
        );
        assert_eq!(config.client.queue_only, Some(true));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_dir(), PathBuf::from("/var/log/usercycle"));
        assert_eq!(config.logging.max_files, 3);
    }

    #[test]
    fn test_resolve_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            ClientConfig::resolve("key", ClientOptions::default().with_log_dir(dir.path()))
                .unwrap();

        assert_eq!(config.api_key(), "key");
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(!config.queue_only());
        assert!(config.mirror_to_stderr());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.timeout(), Duration::from_secs(40));
        assert_eq!(config.base_url(), "http://api.usercycle.com/api/v1");
    }

    #[test]
    fn test_resolve_treats_empty_values_as_unset() {
        let dir = TempDir::new().unwrap();
        let options = ClientOptions::default()
            .with_log_dir(dir.path())
            .with_host("  ")
            .with_port(0);
        let config = ClientConfig::resolve("key", options).unwrap();

        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_resolve_rejects_missing_log_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = ClientConfig::resolve("key", ClientOptions::default().with_log_dir(&missing))
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn test_resolve_rejects_file_as_log_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain-file");
        std::fs::write(&file, "x").unwrap();

        let result = ClientConfig::resolve("key", ClientOptions::default().with_log_dir(&file));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_writability_check_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        ClientConfig::resolve("key", ClientOptions::default().with_log_dir(dir.path())).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_base_url_with_port_and_scheme() {
        let dir = TempDir::new().unwrap();
        let options = ClientOptions::default()
            .with_log_dir(dir.path())
            .with_host("https://staging.usercycle.com/")
            .with_port(8443);
        let config = ClientConfig::resolve("key", options).unwrap();

        assert_eq!(config.base_url(), "https://staging.usercycle.com:8443/api/v1");
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = ClientOptions::default()
            .with_host("from-config")
            .with_port(8080)
            .with_queue_only(true);
        let merged = base.merge(ClientOptions::default().with_host("from-cli"));

        assert_eq!(merged.host.as_deref(), Some("from-cli"));
        assert_eq!(merged.port, Some(8080));
        assert_eq!(merged.queue_only, Some(true));
    }
}
