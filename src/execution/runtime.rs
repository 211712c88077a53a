//! The container runtime seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::execution::mounts::VolumeMount;
use crate::naming::{ContainerReference, ImageReference, VolumeReference};

/// A coordinator-owned container as seen in a runtime listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub reference: ContainerReference,
    pub running: bool,
}

/// Primitive operations against a container runtime.
///
/// Listings of images, containers and volumes only return resources carrying the
/// ownership label. Every created container and volume gets that label.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Owned local images, one entry per tag and per digest.
    async fn list_images(&self) -> Result<Vec<ImageReference>>;

    /// Owned containers, running and stopped.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Owned volumes.
    async fn list_volumes(&self) -> Result<Vec<VolumeReference>>;

    /// The most recently created image carrying `label` (`key=value`), if any.
    async fn find_image_by_label(&self, label: &str) -> Result<Option<ImageReference>>;

    async fn pull_image(&self, image: &ImageReference) -> Result<()>;

    /// Creates a container on the coordinator network.
    async fn create_container(
        &self,
        container: &ContainerReference,
        image: &ImageReference,
        mounts: &[VolumeMount],
    ) -> Result<()>;

    async fn start_container(&self, container: &ContainerReference) -> Result<()>;

    /// Blocks until the container stops and returns its exit code.
    async fn wait_container(&self, container: &ContainerReference) -> Result<i64>;

    /// Force-removes a container, running or not.
    async fn remove_container(&self, container: &ContainerReference) -> Result<()>;

    async fn create_volume(&self, volume: &VolumeReference) -> Result<()>;

    async fn remove_volume(&self, volume: &VolumeReference) -> Result<()>;

    async fn network_exists(&self, name: &str) -> Result<bool>;

    async fn create_network(&self, name: &str) -> Result<()>;
}
