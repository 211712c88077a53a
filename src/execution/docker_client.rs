//! Docker API wrapper using the bollard crate.
//!
//! Implements [`ContainerRuntime`] against the local Docker daemon. Every
//! container and volume created here carries the ownership label, and the
//! listings only return labelled resources.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::volume::{CreateVolumeOptions, ListVolumesOptions, RemoveVolumeOptions};
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, Result};
use crate::execution::mounts::VolumeMount;
use crate::execution::runtime::{ContainerRuntime, ContainerSummary};
use crate::execution::{NETWORK_NAME, OWNER_LABEL_KEY, OWNER_LABEL_VALUE};
use crate::naming::{ContainerReference, ImageReference, VolumeReference};

/// Docker client wrapper for coordinator-owned resources.
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Creates a new Docker client connecting to the local Docker daemon.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::Docker` if the connection settings are unusable.
    pub fn new() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| CoordinatorError::docker("connect", e))?;

        Ok(Self { docker })
    }

    /// Creates a new Docker client from an existing bollard Docker instance.
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

fn owner_labels() -> HashMap<String, String> {
    HashMap::from([(OWNER_LABEL_KEY.to_string(), OWNER_LABEL_VALUE.to_string())])
}

fn label_filter(label: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([("label".to_string(), vec![label.to_string()])])
}

fn owner_filter() -> HashMap<String, Vec<String>> {
    label_filter(&format!("{OWNER_LABEL_KEY}={OWNER_LABEL_VALUE}"))
}

fn owned_images_options() -> ListImagesOptions<String> {
    ListImagesOptions {
        all: false,
        filters: owner_filter(),
        ..Default::default()
    }
}

fn to_docker_mount(mount: &VolumeMount) -> Mount {
    Mount {
        target: Some(mount.target.clone()),
        source: Some(mount.volume.name()),
        typ: Some(MountTypeEnum::VOLUME),
        read_only: Some(mount.read_only),
        ..Default::default()
    }
}

/// Expands the tags and digests of one listed image into references.
///
/// Dangling `<none>` entries are dropped.
fn image_references(repo_tags: &[String], repo_digests: &[String]) -> Vec<ImageReference> {
    repo_tags
        .iter()
        .chain(repo_digests.iter())
        .filter(|s| !s.starts_with("<none>"))
        .filter_map(|s| ImageReference::parse(s).ok())
        .collect()
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_images(&self) -> Result<Vec<ImageReference>> {
        let images = self
            .docker
            .list_images(Some(owned_images_options()))
            .await
            .map_err(|e| CoordinatorError::docker("list images", e))?;

        Ok(images
            .iter()
            .flat_map(|image| image_references(&image.repo_tags, &image.repo_digests))
            .collect())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: owner_filter(),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| CoordinatorError::docker("list containers", e))?;

        let mut summaries = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(name) = container.names.as_ref().and_then(|n| n.first()) else {
                continue;
            };
            match ContainerReference::parse_name(name) {
                Ok(reference) => summaries.push(ContainerSummary {
                    reference,
                    running: container.state.as_deref() == Some("running"),
                }),
                Err(e) => warn!(container = %name, error = %e, "Skipping labelled container"),
            }
        }

        Ok(summaries)
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeReference>> {
        let options = ListVolumesOptions::<String> {
            filters: owner_filter(),
        };

        let response = self
            .docker
            .list_volumes(Some(options))
            .await
            .map_err(|e| CoordinatorError::docker("list volumes", e))?;

        let mut volumes = Vec::new();
        for volume in response.volumes.unwrap_or_default() {
            match VolumeReference::parse_name(&volume.name) {
                Ok(reference) => volumes.push(reference),
                Err(e) => warn!(volume = %volume.name, error = %e, "Skipping labelled volume"),
            }
        }

        Ok(volumes)
    }

    async fn find_image_by_label(&self, label: &str) -> Result<Option<ImageReference>> {
        let options = ListImagesOptions::<String> {
            all: false,
            filters: label_filter(label),
            ..Default::default()
        };

        let mut images = self
            .docker
            .list_images(Some(options))
            .await
            .map_err(|e| CoordinatorError::docker("list images", e))?;

        images.sort_by_key(|image| std::cmp::Reverse(image.created));

        Ok(images
            .iter()
            .find_map(|image| image_references(&image.repo_tags, &image.repo_digests).into_iter().next()))
    }

    async fn pull_image(&self, image: &ImageReference) -> Result<()> {
        let options = match &image.digest {
            Some(_) => CreateImageOptions {
                from_image: image.reference(),
                ..Default::default()
            },
            None => CreateImageOptions {
                from_image: image.repository.clone(),
                tag: image.tag.clone(),
                ..Default::default()
            },
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            let progress = result.map_err(|e| CoordinatorError::docker(format!("pull {image}"), e))?;
            debug!(
                image = %image,
                status = progress.status.as_deref().unwrap_or_default(),
                progress = progress.progress.as_deref().unwrap_or_default(),
                "Pull progress"
            );
        }

        info!(image = %image, "Pulled image");
        Ok(())
    }

    async fn create_container(
        &self,
        container: &ContainerReference,
        image: &ImageReference,
        mounts: &[VolumeMount],
    ) -> Result<()> {
        let host_config = HostConfig {
            network_mode: Some(NETWORK_NAME.to_string()),
            mounts: if mounts.is_empty() {
                None
            } else {
                Some(mounts.iter().map(to_docker_mount).collect())
            },
            ..Default::default()
        };

        let container_config = Config {
            image: Some(image.reference()),
            labels: Some(owner_labels()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: container.name(),
            platform: None,
        };

        self.docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| CoordinatorError::docker(format!("create container {container}"), e))?;

        debug!(container = %container, image = %image, "Created container");
        Ok(())
    }

    async fn start_container(&self, container: &ContainerReference) -> Result<()> {
        self.docker
            .start_container(&container.name(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| CoordinatorError::docker(format!("start container {container}"), e))?;

        Ok(())
    }

    async fn wait_container(&self, container: &ContainerReference) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(&container.name(), Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports non-zero exits as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(CoordinatorError::docker(format!("wait container {container}"), e)),
            None => Ok(0),
        }
    }

    async fn remove_container(&self, container: &ContainerReference) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_container(&container.name(), Some(options))
            .await
            .map_err(|e| CoordinatorError::docker(format!("remove container {container}"), e))?;

        debug!(container = %container, "Removed container");
        Ok(())
    }

    async fn create_volume(&self, volume: &VolumeReference) -> Result<()> {
        let options = CreateVolumeOptions {
            name: volume.name(),
            driver: "local".to_string(),
            driver_opts: HashMap::new(),
            labels: owner_labels(),
        };

        self.docker
            .create_volume(options)
            .await
            .map_err(|e| CoordinatorError::docker(format!("create volume {volume}"), e))?;

        debug!(volume = %volume, "Created volume");
        Ok(())
    }

    async fn remove_volume(&self, volume: &VolumeReference) -> Result<()> {
        self.docker
            .remove_volume(&volume.name(), Some(RemoveVolumeOptions { force: true }))
            .await
            .map_err(|e| CoordinatorError::docker(format!("remove volume {volume}"), e))?;

        debug!(volume = %volume, "Removed volume");
        Ok(())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        let options = ListNetworksOptions::<String> {
            filters: HashMap::from([("name".to_string(), vec![name.to_string()])]),
        };

        let networks = self
            .docker
            .list_networks(Some(options))
            .await
            .map_err(|e| CoordinatorError::docker("list networks", e))?;

        // the name filter matches substrings
        Ok(networks.iter().any(|n| n.name.as_deref() == Some(name)))
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: "bridge".to_string(),
            labels: owner_labels(),
            ..Default::default()
        };

        self.docker
            .create_network(options)
            .await
            .map_err(|e| CoordinatorError::docker(format!("create network {name}"), e))?;

        info!(network = %name, "Created network");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_filter() {
        let filter = owner_filter();
        assert_eq!(filter["label"], vec!["cyanprint.dev=true".to_string()]);
    }

    #[test]
    fn test_image_listing_is_owner_filtered() {
        let options = owned_images_options();
        assert!(!options.all);
        assert_eq!(options.filters, owner_filter());
    }

    #[test]
    fn test_docker_mount_uses_volume_name() {
        let volume = VolumeReference::new("0b4a1d2c-3e5f-4a6b-8c7d-9e0f1a2b3c4d").with_session("s1");
        let mount = to_docker_mount(&VolumeMount::read_only(volume, "/workspace/cyanprint"));

        assert_eq!(mount.source.as_deref(), Some("cyan-0b4a1d2c3e5f4a6b8c7d9e0f1a2b3c4d-s1"));
        assert_eq!(mount.target.as_deref(), Some("/workspace/cyanprint"));
        assert_eq!(mount.typ, Some(MountTypeEnum::VOLUME));
        assert_eq!(mount.read_only, Some(true));
    }

    #[test]
    fn test_image_references_expand_tags_and_digests() {
        let refs = image_references(
            &["team/app:1.0".to_string(), "<none>:<none>".to_string()],
            &["team/app@sha256:abc".to_string(), "<none>@<none>".to_string()],
        );

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], ImageReference::new("team/app", "1.0"));
        assert_eq!(refs[1].digest.as_deref(), Some("sha256:abc"));
    }
}
