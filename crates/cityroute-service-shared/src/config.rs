//! Service configuration read from environment variables.
//!
//! - `CITYROUTE_STORE_PATH`: SQLite document store (default `/data/osm_data.db`)
//! - `SERVICE_PORT`: HTTP port (default 8080)
//! - `CITYROUTE_OUTPUT_DIR`: directory for rendered and exported files (default `.`)
//! - `REQUEST_TIMEOUT_SECS`: budget for one request's blocking work (default 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_STORE_PATH: &str = "CITYROUTE_STORE_PATH";
pub const ENV_PORT: &str = "SERVICE_PORT";
pub const ENV_OUTPUT_DIR: &str = "CITYROUTE_OUTPUT_DIR";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECS";

const DEFAULT_STORE_PATH: &str = "/data/osm_data.db";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value '{value}' for {variable}: {reason}")]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Runtime configuration of the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub store_path: PathBuf,
    pub port: u16,
    pub output_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            port: DEFAULT_PORT,
            output_dir: PathBuf::from("."),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let store_path = lookup(ENV_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);
        let output_dir = lookup(ENV_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let port = match lookup(ENV_PORT) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError {
                variable: ENV_PORT,
                value,
                reason: "expected a port number",
            })?,
            None => defaults.port,
        };

        let request_timeout = match lookup(ENV_REQUEST_TIMEOUT) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError {
                        variable: ENV_REQUEST_TIMEOUT,
                        value,
                        reason: "expected a positive number of seconds",
                    })
                }
            },
            None => defaults.request_timeout,
        };

        Ok(Self {
            store_path,
            port,
            output_dir,
            request_timeout,
        })
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.store_path, PathBuf::from("/data/osm_data.db"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_all_variables() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("CITYROUTE_STORE_PATH", "/tmp/osm.db"),
            ("SERVICE_PORT", "9000"),
            ("CITYROUTE_OUTPUT_DIR", "/tmp/out"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/osm.db"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_port_and_timeout() {
        let err = ServiceConfig::from_lookup(lookup(&[("SERVICE_PORT", "http")])).unwrap_err();
        assert_eq!(err.variable, "SERVICE_PORT");

        let err =
            ServiceConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err.variable, "REQUEST_TIMEOUT_SECS");
    }
}
