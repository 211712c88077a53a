//! Coordinator configuration.
//!
//! Runtime knobs for the coordinator: batch parallelism, the registry
//! endpoint, readiness probing and the label used to find the coordinator's
//! own image. Wire-level conventions (ownership label, network, mount paths,
//! ports) are fixed and live next to the code that uses them.

use std::time::Duration;
use thiserror::Error;

/// Label carried by the coordinator's own image.
pub const DEFAULT_COORDINATOR_IMAGE_LABEL: &str = "cyanprint.name=sulfone-boron";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum number of batch items in flight at once.
    pub parallelism: usize,
    /// Base URL of the entity registry API.
    pub registry_endpoint: String,
    /// Number of readiness polls before giving up on a container.
    pub readiness_attempts: u32,
    /// Fixed delay between readiness polls.
    pub readiness_interval: Duration,
    /// `key=value` label carried by the coordinator image, used to launch mergers.
    pub coordinator_image_label: String,
    /// Timeout for registry and worker HTTP requests.
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            registry_endpoint: "http://localhost:9001".to_string(),
            readiness_attempts: 60,
            readiness_interval: Duration::from_secs(1),
            coordinator_image_label: DEFAULT_COORDINATOR_IMAGE_LABEL.to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Host CPU count, falling back to 1 when it cannot be determined.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl CoordinatorConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CYANPRINT_PARALLELISM`: Batch parallelism (default: CPU count)
    /// - `CYANPRINT_REGISTRY_ENDPOINT`: Registry base URL (default: http://localhost:9001)
    /// - `CYANPRINT_READINESS_ATTEMPTS`: Readiness polls (default: 60)
    /// - `CYANPRINT_READINESS_INTERVAL_MS`: Delay between polls (default: 1000)
    /// - `CYANPRINT_COORDINATOR_IMAGE_LABEL`: Coordinator image label (default: cyanprint.name=sulfone-boron)
    /// - `CYANPRINT_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 300)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CYANPRINT_PARALLELISM") {
            config.parallelism = parse_env_value(&val, "CYANPRINT_PARALLELISM")?;
        }

        if let Ok(val) = std::env::var("CYANPRINT_REGISTRY_ENDPOINT") {
            config.registry_endpoint = val;
        }

        if let Ok(val) = std::env::var("CYANPRINT_READINESS_ATTEMPTS") {
            config.readiness_attempts = parse_env_value(&val, "CYANPRINT_READINESS_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("CYANPRINT_READINESS_INTERVAL_MS") {
            let millis: u64 = parse_env_value(&val, "CYANPRINT_READINESS_INTERVAL_MS")?;
            config.readiness_interval = Duration::from_millis(millis);
        }

        if let Ok(val) = std::env::var("CYANPRINT_COORDINATOR_IMAGE_LABEL") {
            config.coordinator_image_label = val;
        }

        if let Ok(val) = std::env::var("CYANPRINT_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "CYANPRINT_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::ValidationFailed(
                "parallelism must be greater than 0".to_string(),
            ));
        }

        if self.registry_endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "registry_endpoint cannot be empty".to_string(),
            ));
        }

        if self.readiness_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "readiness_attempts must be greater than 0".to_string(),
            ));
        }

        if !self.coordinator_image_label.contains('=') {
            return Err(ConfigError::ValidationFailed(
                "coordinator_image_label must have the form key=value".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set batch parallelism.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Builder method to set the registry endpoint.
    pub fn with_registry_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.registry_endpoint = endpoint.into();
        self
    }

    /// Builder method to set readiness probing.
    pub fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval = interval;
        self
    }

    /// Builder method to set the coordinator image label.
    pub fn with_coordinator_image_label(mut self, label: impl Into<String>) -> Self {
        self.coordinator_image_label = label.into();
        self
    }

    /// Builder method to set the HTTP request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Parse an environment variable value.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
