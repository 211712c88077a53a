//! Batched resource operations on top of a [`ContainerRuntime`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DEFAULT_COORDINATOR_IMAGE_LABEL;
use crate::error::{BatchFailure, CoordinatorError, Result};
use crate::execution::mounts::VolumeMount;
use crate::execution::runtime::{ContainerRuntime, ContainerSummary};
use crate::execution::NETWORK_NAME;
use crate::naming::{ContainerReference, ImageReference, VolumeReference};
use crate::scheduler::{collect_batch, BoundedTaskPool};

/// Creates, lists and removes coordinator-owned resources.
///
/// Cheap to clone; clones share the runtime.
#[derive(Clone)]
pub struct ResourceLifecycleManager {
    runtime: Arc<dyn ContainerRuntime>,
    pool: BoundedTaskPool,
    coordinator_label: String,
}

impl ResourceLifecycleManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, pool: BoundedTaskPool) -> Self {
        Self {
            runtime,
            pool,
            coordinator_label: DEFAULT_COORDINATOR_IMAGE_LABEL.to_string(),
        }
    }

    /// Sets the `key=value` label that identifies the coordinator image.
    pub fn with_coordinator_label(mut self, label: impl Into<String>) -> Self {
        self.coordinator_label = label.into();
        self
    }

    pub fn pool(&self) -> &BoundedTaskPool {
        &self.pool
    }

    pub async fn list_images(&self) -> Result<Vec<ImageReference>> {
        self.runtime.list_images().await
    }

    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        self.runtime.list_containers().await
    }

    pub async fn list_volumes(&self) -> Result<Vec<VolumeReference>> {
        self.runtime.list_volumes().await
    }

    /// Pulls every image, at most `pool.limit()` at a time.
    ///
    /// # Errors
    ///
    /// Returns one error per image that failed to pull.
    pub async fn pull_images(&self, images: Vec<ImageReference>) -> Result<(), BatchFailure> {
        if images.is_empty() {
            return Ok(());
        }
        info!(count = images.len(), "Pulling images");
        let results = self
            .pool
            .run(images, |image| async move { self.runtime.pull_image(&image).await })
            .await;
        collect_batch(results).map(|_| ())
    }

    /// Creates a container and starts it.
    pub async fn launch(
        &self,
        container: &ContainerReference,
        image: &ImageReference,
        mounts: &[VolumeMount],
    ) -> Result<()> {
        self.runtime.create_container(container, image, mounts).await?;
        self.runtime.start_container(container).await?;
        info!(container = %container, image = %image, "Started container");
        Ok(())
    }

    /// Runs a container until it exits, then removes it.
    ///
    /// # Errors
    ///
    /// Fails if any step fails or the container exits non-zero. The
    /// container is left in place on failure.
    pub async fn run_to_completion(
        &self,
        container: &ContainerReference,
        image: &ImageReference,
        mounts: &[VolumeMount],
    ) -> Result<()> {
        self.launch(container, image, mounts).await?;
        let code = self.runtime.wait_container(container).await?;
        if code != 0 {
            return Err(CoordinatorError::ContainerExited {
                container: container.name(),
                code,
            });
        }
        self.runtime.remove_container(container).await?;
        debug!(container = %container, "Container completed");
        Ok(())
    }

    pub async fn create_volume(&self, volume: &VolumeReference) -> Result<()> {
        self.runtime.create_volume(volume).await?;
        info!(volume = %volume, "Created volume");
        Ok(())
    }

    pub async fn remove_container(&self, container: &ContainerReference) -> Result<()> {
        self.runtime.remove_container(container).await
    }

    pub async fn remove_volume(&self, volume: &VolumeReference) -> Result<()> {
        self.runtime.remove_volume(volume).await
    }

    /// Force-removes every container in the batch.
    pub async fn remove_containers(
        &self,
        containers: Vec<ContainerReference>,
    ) -> Result<(), BatchFailure> {
        let results = self
            .pool
            .run(containers, |container| async move {
                self.runtime.remove_container(&container).await
            })
            .await;
        collect_batch(results).map(|_| ())
    }

    /// Force-removes every volume in the batch.
    pub async fn remove_volumes(
        &self,
        volumes: Vec<VolumeReference>,
    ) -> Result<(), BatchFailure> {
        let results = self
            .pool
            .run(volumes, |volume| async move { self.runtime.remove_volume(&volume).await })
            .await;
        collect_batch(results).map(|_| ())
    }

    /// Creates the coordinator bridge network unless it already exists.
    pub async fn ensure_network(&self) -> Result<()> {
        if self.runtime.network_exists(NETWORK_NAME).await? {
            debug!(network = NETWORK_NAME, "Network already present");
            return Ok(());
        }
        self.runtime.create_network(NETWORK_NAME).await
    }

    /// The newest local image carrying the coordinator label.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::MissingImage` if no image carries the label.
    pub async fn coordinator_image(&self) -> Result<ImageReference> {
        match self.runtime.find_image_by_label(&self.coordinator_label).await? {
            Some(image) => Ok(image),
            None => {
                warn!(label = %self.coordinator_label, "No coordinator image found");
                Err(CoordinatorError::MissingImage(self.coordinator_label.clone()))
            }
        }
    }
}
