//! Configuration loading and default template generation.
//!
//! # Configuration File Format
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! shutdown_timeout_secs = 10
//! log_level = "info"
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;

use httpserver::{DEFAULT_ADDRESS, DEFAULT_SHUTDOWN_TIMEOUT, Error};
use serde::Deserialize;

const DEFAULT_PORT: u16 = 8080;

/// Settings for the `serve` command.
///
/// Keys missing from the file fall back to the `HOST` / `PORT` environment
/// variables and then to hardcoded defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_shutdown_timeout_secs")]
    shutdown_timeout_secs: u64,
    #[serde(default)]
    log_level: Option<String>,
}

impl Config {
    /// Bind address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Listening port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Budget for draining and shutdown hooks.
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }
}

fn default_host() -> String {
    env::var("HOST")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_owned())
}

fn default_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

const fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
}

/// Parse configuration from TOML text.
///
/// # Errors
///
/// Returns [`Error::Config`] for malformed TOML or a zero shutdown timeout.
pub fn parse_config(content: &str) -> Result<Config, Error> {
    let config: Config =
        toml::from_str(content).map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
    if config.shutdown_timeout_secs == 0 {
        return Err(Error::config("shutdown_timeout_secs must be greater than zero"));
    }
    Ok(config)
}

/// Load configuration from a TOML file at the given path.
///
/// # Errors
///
/// Returns an error if the file cannot be resolved, read, or parsed.
pub fn load_config(path: &Path) -> Result<Config, Error> {
    let config_path = path.canonicalize().map_err(|e| {
        Error::config(format!(
            "failed to resolve config path '{}': {e}",
            path.display()
        ))
    })?;
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::config(format!(
            "failed to read config file '{}': {e}",
            config_path.display()
        ))
    })?;
    parse_config(&content).map_err(|e| match e {
        Error::Config(msg) => Error::config(format!("{}: {msg}", config_path.display())),
        other => other,
    })
}

/// Generate a default TOML configuration template.
#[must_use]
pub fn generate_default_config() -> String {
    format!(
        r#"# httpserver configuration

# Server bind address and port.
# Can also be set via HOST / PORT environment variables.
host = "{DEFAULT_ADDRESS}"
port = {DEFAULT_PORT}

# Seconds allowed for draining connections plus all shutdown hooks.
shutdown_timeout_secs = {}

# Log filter used when RUST_LOG is not set, e.g. "debug" or "httpserver=debug".
log_level = "info"
"#,
        DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_are_used() {
        let config = parse_config(
            r#"
host = "127.0.0.1"
port = 9000
shutdown_timeout_secs = 3
log_level = "debug"
"#,
        )
        .expect("valid config");

        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 9000);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(config.log_level(), Some("debug"));
    }

    #[test]
    fn missing_timeout_uses_default() {
        let config = parse_config("host = \"::1\"\nport = 1").expect("valid config");
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(config.log_level(), None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse_config("shutdown_timeout_secs = 0").expect_err("zero timeout");
        assert!(err.to_string().contains("shutdown_timeout_secs"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("listen = \"0.0.0.0\"").is_err());
    }

    #[test]
    fn generated_template_parses() {
        let config = parse_config(&generate_default_config()).expect("template parses");
        assert_eq!(config.host(), DEFAULT_ADDRESS);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_config(&dir.path().join("absent.toml")).expect_err("missing file");
        assert!(err.to_string().contains("failed to resolve config path"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "host = \"127.0.0.1\"\nport = 8181\n").expect("write config");

        let config = load_config(&path).expect("load config");
        assert_eq!(config.port(), 8181);
    }
}
