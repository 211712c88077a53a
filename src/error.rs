//! Error types for coordinator operations.
//!
//! Defines the error taxonomy shared by every subsystem:
//! - Container runtime transport (bollard)
//! - Registry and worker HTTP transport (reqwest)
//! - Reference and name decoding
//! - Version resolution against a template's allow-list
//! - Readiness probing
//! - Batch operations that aggregate per-item failures

use std::fmt;

use thiserror::Error;

/// Errors produced by a single coordinator operation.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The container runtime rejected or failed a request. The runtime's error is kept as-is.
    #[error("Docker {context} failed: {source}")]
    Docker {
        context: String,
        #[source]
        source: bollard::errors::Error,
    },

    /// A registry or worker endpoint could not be reached.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A registry or worker endpoint answered with a non-success status.
    #[error("Unexpected status {status} from {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid registry reference '{0}': expected 'username/name' or 'username/name:version'")]
    InvalidReference(String),

    #[error("Invalid resource name '{0}'")]
    InvalidName(String),

    #[error("Invalid session id '{0}': must be non-empty and contain only [A-Za-z0-9_.]")]
    InvalidSession(String),

    /// No registry version of the reference is pinned by the template.
    #[error("No version of '{reference}' is allowed by template {template}")]
    VersionMismatch { reference: String, template: String },

    /// A resolved entity is not in the template's allow-list.
    #[error("{kind} '{id}' is not part of template {template}")]
    NotInTemplate {
        kind: String,
        id: String,
        template: String,
    },

    #[error("Endpoint {endpoint} not ready after {attempts} attempts")]
    ReadinessTimeout { endpoint: String, attempts: u32 },

    #[error("Container {container} exited with status {code}")]
    ContainerExited { container: String, code: i64 },

    #[error("No image found with label '{0}'")]
    MissingImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoordinatorError {
    /// Wraps a bollard error with the operation it came from.
    pub fn docker(context: impl Into<String>, source: bollard::errors::Error) -> Self {
        Self::Docker {
            context: context.into(),
            source,
        }
    }
}

/// Aggregated failures of a batch operation.
///
/// Holds one error per failed item. Items that succeeded are not represented.
#[derive(Debug, Default)]
pub struct BatchFailure {
    pub errors: Vec<CoordinatorError>,
}

impl BatchFailure {
    pub fn new(errors: Vec<CoordinatorError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Appends all errors of `other`.
    pub fn extend(&mut self, other: BatchFailure) {
        self.errors.extend(other.errors);
    }

    /// Returns `Ok(value)` when no errors were collected.
    pub fn into_result<T>(self, value: T) -> Result<T, BatchFailure> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<CoordinatorError> for BatchFailure {
    fn from(error: CoordinatorError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchFailure {}

/// Result alias for single-resource operations.
pub type Result<T, E = CoordinatorError> = std::result::Result<T, E>;
