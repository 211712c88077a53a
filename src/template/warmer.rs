//! Reconciling the long-lived resources of a template version.
//!
//! A warm template has its runtime and blob images present locally, its
//! content unpacked into the shared template volume, and its template
//! service container running and answering on port 5550.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::BatchFailure;
use crate::execution::mounts::{template_mounts, unzip_mounts};
use crate::execution::{ContainerSummary, ResourceLifecycleManager};
use crate::naming::{ContainerReference, ContainerRole, ImageReference, VolumeReference};
use crate::template::TemplateVersion;
use crate::worker::WorkerApi;

/// Brings a template version's shared resources to the desired state.
pub struct TemplateWarmer {
    lifecycle: ResourceLifecycleManager,
    workers: Arc<dyn WorkerApi>,
}

/// What a template is missing, computed from runtime listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingTemplateResources {
    pub images: Vec<ImageReference>,
    pub volume: Option<VolumeReference>,
    pub container: Option<ContainerReference>,
}

impl MissingTemplateResources {
    /// Diffs a template against running containers, local images and owned volumes.
    pub fn compute(
        template: &TemplateVersion,
        running: &[ContainerSummary],
        images: &[ImageReference],
        volumes: &[VolumeReference],
    ) -> Self {
        let container = ContainerReference::new(ContainerRole::Template, template.id());
        let volume = template.template_volume();

        let wanted = [
            template.principal.runtime_image(),
            template.principal.blob_image(),
        ];
        let mut missing_images: Vec<ImageReference> = Vec::new();
        for image in wanted {
            let present = images.iter().any(|listed| image.is_satisfied_by(listed));
            if !present && !missing_images.contains(&image) {
                missing_images.push(image);
            }
        }

        Self {
            images: missing_images,
            volume: (!volumes.contains(&volume)).then_some(volume),
            container: (!running.iter().any(|c| c.reference == container)).then_some(container),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.volume.is_none() && self.container.is_none()
    }
}

impl TemplateWarmer {
    pub fn new(lifecycle: ResourceLifecycleManager, workers: Arc<dyn WorkerApi>) -> Self {
        Self { lifecycle, workers }
    }

    /// Warms a template version: sweep, diff, pull, unpack, launch, probe.
    ///
    /// Stopped coordinator containers are removed first. Missing images are
    /// pulled before anything is created from them. The template container
    /// is only created once its volume holds the unpacked content.
    ///
    /// # Errors
    ///
    /// Returns every error of the failing stage. Later stages that depend on
    /// it are not attempted.
    pub async fn warm(&self, template: &TemplateVersion) -> Result<(), BatchFailure> {
        info!(template = %template.id(), "Warming template");

        let (running, images, volumes) = tokio::join!(
            self.sweep_stopped_containers(),
            self.lifecycle.list_images(),
            self.lifecycle.list_volumes(),
        );

        let mut failure = BatchFailure::default();
        let running = running.unwrap_or_else(|e| {
            failure.extend(e);
            Vec::new()
        });
        let images = images.unwrap_or_else(|e| {
            failure.errors.push(e);
            Vec::new()
        });
        let volumes = volumes.unwrap_or_else(|e| {
            failure.errors.push(e);
            Vec::new()
        });
        if !failure.is_empty() {
            return Err(failure);
        }

        let missing = MissingTemplateResources::compute(template, &running, &images, &volumes);
        if missing.is_empty() {
            info!(template = %template.id(), "Template resources already present");
        }

        self.lifecycle.pull_images(missing.images.clone()).await?;

        if let Some(volume) = &missing.volume {
            self.unpack_template(template, volume).await?;
        }

        let container = ContainerReference::new(ContainerRole::Template, template.id());
        if missing.container.is_some() {
            self.lifecycle
                .launch(
                    &container,
                    &template.principal.runtime_image(),
                    &template_mounts(&template.template_volume()),
                )
                .await?;
        }

        self.workers.wait_ready(&container).await?;
        info!(template = %template.id(), "Template warm");
        Ok(())
    }

    /// Removes stopped coordinator containers and returns the running ones.
    async fn sweep_stopped_containers(&self) -> Result<Vec<ContainerSummary>, BatchFailure> {
        let containers = self.lifecycle.list_containers().await?;
        let (running, stopped): (Vec<_>, Vec<_>) = containers.into_iter().partition(|c| c.running);

        if !stopped.is_empty() {
            warn!(count = stopped.len(), "Removing stopped containers");
            self.lifecycle
                .remove_containers(stopped.into_iter().map(|c| c.reference).collect())
                .await?;
        }

        Ok(running)
    }

    /// Creates the template volume and fills it from the blob image.
    ///
    /// A failed unpack removes the helper container and the volume, so the
    /// next warm-up sees the volume as missing and unpacks again.
    async fn unpack_template(
        &self,
        template: &TemplateVersion,
        volume: &VolumeReference,
    ) -> Result<(), BatchFailure> {
        self.lifecycle.create_volume(volume).await?;

        let helper = ContainerReference::new(ContainerRole::Unzip, template.id());
        let unpacked = self
            .lifecycle
            .run_to_completion(&helper, &template.principal.blob_image(), &unzip_mounts(volume))
            .await;

        if let Err(e) = unpacked {
            warn!(template = %template.id(), volume = %volume, error = %e, "Unpack failed, discarding volume");
            let mut failure = BatchFailure::from(e);
            // the helper may not exist if creating it was the failing step
            if let Err(cleanup) = self.lifecycle.remove_container(&helper).await {
                warn!(container = %helper, error = %cleanup, "Could not remove unzip helper");
            }
            if let Err(cleanup) = self.lifecycle.remove_volume(volume).await {
                failure.errors.push(cleanup);
            }
            return Err(failure);
        }

        info!(template = %template.id(), volume = %volume, "Unpacked template content");
        Ok(())
    }
}
