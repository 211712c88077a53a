//! The HTTP surface of worker containers.
//!
//! Processors, plugins, mergers and template services all listen on a fixed
//! port per role and are addressed by container name on the coordinator
//! network:
//!
//! | Role | Port | Calls |
//! |---|---|---|
//! | template | 5550 | `GET /` |
//! | processor | 5551 | `GET /`, `POST /api/process` |
//! | plugin | 5552 | `GET /`, `POST /api/plug` |
//! | merger | 9000 | `GET /`, `POST /merge/{session}` |

pub mod client;
pub mod readiness;
pub mod types;

use async_trait::async_trait;

pub use client::HttpWorkerClient;
pub use readiness::ReadinessProber;
pub use types::{
    GlobSelector, MergeRequest, PlugRequest, ProcessRequest, ProcessResponse, StandardResponse,
};

use crate::error::{CoordinatorError, Result};
use crate::naming::ContainerReference;

/// Base URL of a container's HTTP service, e.g. `http://cyan-processor-<id>-s1:5551`.
///
/// # Errors
///
/// Returns `CoordinatorError::InvalidName` for roles that serve no HTTP endpoint.
pub fn service_url(container: &ContainerReference) -> Result<String> {
    let port = container.role.port().ok_or_else(|| {
        CoordinatorError::InvalidName(format!("{} serves no HTTP endpoint", container.name()))
    })?;
    Ok(format!("http://{}:{}", container.name(), port))
}

/// Calls made by the coordinator to worker containers.
#[async_trait]
pub trait WorkerApi: Send + Sync {
    /// Blocks until the container's service answers its liveness route.
    async fn wait_ready(&self, container: &ContainerReference) -> Result<()>;

    async fn process(
        &self,
        container: &ContainerReference,
        request: &ProcessRequest,
    ) -> Result<ProcessResponse>;

    async fn plug(&self, container: &ContainerReference, request: &PlugRequest) -> Result<()>;

    async fn merge(
        &self,
        container: &ContainerReference,
        session: &str,
        request: &MergeRequest,
    ) -> Result<StandardResponse>;
}
