//! Client configuration

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable prefix, e.g. `PORTAL_API_URL`
pub const ENV_PREFIX: &str = "PORTAL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend
    pub api_url: String,

    /// Request timeout in seconds; no timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Directory the session is persisted in; platform data dir when unset
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: None,
            storage_dir: None,
            user_agent: concat!("portal-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed
    pub fn from_env() -> Result<Self, ClientError> {
        Self::load(None)
    }

    /// Load configuration from defaults, an optional file, then the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is malformed
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)
            .map_err(config_error)?
            .set_default("user_agent", defaults.user_agent)
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(config_error)?;

        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can be used to build a client
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = url::Url::parse(&self.api_url).map_err(|err| {
            ClientError::Configuration(format!("invalid api_url '{}': {err}", self.api_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "api_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(ClientError::Configuration(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> ClientError {
    ClientError::Configuration(err.to_string())
}
