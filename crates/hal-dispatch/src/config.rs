use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9990";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PROCESS_STATE_CAPACITY: usize = 16;

pub const ENV_DMR_ENDPOINT: &str = "HAL_DMR_ENDPOINT";
pub const ENV_UPLOAD_ENDPOINT: &str = "HAL_UPLOAD_ENDPOINT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "HAL_REQUEST_TIMEOUT_MS";
pub const ENV_USERNAME: &str = "HAL_USERNAME";
pub const ENV_PASSWORD: &str = "HAL_PASSWORD";

#[derive(Debug, Error)]
/// Enumerates supported `ConfigError` values.
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {name} endpoint '{value}': {reason}")]
    InvalidEndpoint {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid value for {variable}: '{value}'")]
    InvalidEnv { variable: &'static str, value: String },
}

/// Management endpoints of one server or domain controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Endpoint for DMR operations, e.g. `http://localhost:9990/management`.
    pub dmr: String,
    /// Endpoint for multipart uploads, e.g. `http://localhost:9990/management-upload`.
    pub upload: String,
}

impl Endpoints {
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        Self {
            dmr: format!("{base}/management"),
            upload: format!("{base}/management-upload"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("dmr", &self.dmr)?;
        validate_endpoint("upload", &self.upload)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_base_url(DEFAULT_BASE_URL)
    }
}

fn validate_endpoint(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        name,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value.trim()).map_err(|error| invalid(error.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Public struct `DispatcherConfig` used across HAL components.
pub struct DispatcherConfig {
    pub endpoints: Endpoints,
    /// Upper bound for one request/response round trip; `0` disables the timeout.
    pub request_timeout_ms: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Buffered process-state events per subscriber before lagging ones are dropped.
    pub process_state_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            username: None,
            password: None,
            process_state_capacity: DEFAULT_PROCESS_STATE_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.endpoints.validate()?;
        Ok(config)
    }

    /// Reads a TOML file and applies `HAL_*` environment overrides on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(dmr) = lookup(ENV_DMR_ENDPOINT) {
            self.endpoints.dmr = dmr.trim().to_string();
        }
        if let Some(upload) = lookup(ENV_UPLOAD_ENDPOINT) {
            self.endpoints.upload = upload.trim().to_string();
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms =
                timeout
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        variable: ENV_REQUEST_TIMEOUT_MS,
                        value: timeout.clone(),
                    })?;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
        self.endpoints.validate()
    }
}
