//! In-memory stand-ins for the runtime, worker and registry seams.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cyanprint_coordinator::error::{CoordinatorError, Result};
use cyanprint_coordinator::execution::{ContainerRuntime, ContainerSummary, ResourceLifecycleManager, VolumeMount};
use cyanprint_coordinator::naming::{ContainerReference, ImageReference, VolumeReference};
use cyanprint_coordinator::pipeline::merge_files;
use cyanprint_coordinator::registry::{
    EntityKind, RegistryApi, RegistryVersion, RegistryVersionPrincipal, VersionSelector,
};
use cyanprint_coordinator::scheduler::BoundedTaskPool;
use cyanprint_coordinator::template::{PinnedVersion, TemplateVersion, TemplateVersionPrincipal};
use cyanprint_coordinator::worker::{
    MergeRequest, PlugRequest, ProcessRequest, ProcessResponse, StandardResponse, WorkerApi,
};

pub const TEMPLATE_ID: &str = "7f3c2a10-0000-4000-8000-000000000001";

pub fn failure(message: &str) -> CoordinatorError {
    CoordinatorError::Io(std::io::Error::other(message.to_string()))
}

#[derive(Default)]
pub struct RuntimeState {
    pub images: Vec<ImageReference>,
    pub containers: Vec<ContainerSummary>,
    pub volumes: Vec<VolumeReference>,
    pub coordinator_image: Option<ImageReference>,
    pub network: bool,
    pub exit_code: i64,
    pub fail_pull: HashSet<String>,
    pub fail_container_removal: bool,
    /// Every call, as `"<op> <subject>"`, in order.
    pub calls: Vec<String>,
    pub mounts: HashMap<String, Vec<VolumeMount>>,
}

/// A container runtime backed by plain vectors.
#[derive(Default)]
pub struct FakeRuntime {
    pub state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state(f: impl FnOnce(&mut RuntimeState)) -> Arc<Self> {
        let runtime = Self::default();
        f(&mut runtime.state.lock().expect("lock"));
        Arc::new(runtime)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("lock").calls.clone()
    }

    pub fn calls_starting_with(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .map(|c| c[prefix.len()..].to_string())
            .collect()
    }

    pub fn container_names(&self) -> Vec<String> {
        let state = self.state.lock().expect("lock");
        state.containers.iter().map(|c| c.reference.name()).collect()
    }

    pub fn volume_names(&self) -> Vec<String> {
        let state = self.state.lock().expect("lock");
        state.volumes.iter().map(VolumeReference::name).collect()
    }

    pub fn mounts_of(&self, container: &ContainerReference) -> Vec<VolumeMount> {
        let state = self.state.lock().expect("lock");
        state.mounts.get(&container.name()).cloned().unwrap_or_default()
    }

    fn record(&self, state: &mut RuntimeState, op: &str, subject: impl std::fmt::Display) {
        state.calls.push(format!("{op} {subject}"));
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_images(&self) -> Result<Vec<ImageReference>> {
        Ok(self.state.lock().expect("lock").images.clone())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        Ok(self.state.lock().expect("lock").containers.clone())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeReference>> {
        Ok(self.state.lock().expect("lock").volumes.clone())
    }

    async fn find_image_by_label(&self, _label: &str) -> Result<Option<ImageReference>> {
        Ok(self.state.lock().expect("lock").coordinator_image.clone())
    }

    async fn pull_image(&self, image: &ImageReference) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "pull", image);
        if state.fail_pull.contains(&image.reference()) {
            return Err(failure(&format!("pull {image}")));
        }
        state.images.push(image.clone());
        Ok(())
    }

    async fn create_container(
        &self,
        container: &ContainerReference,
        image: &ImageReference,
        mounts: &[VolumeMount],
    ) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "create", format!("{container} {image}"));
        if state.containers.iter().any(|c| &c.reference == container) {
            return Err(failure(&format!("{container} already exists")));
        }
        state.containers.push(ContainerSummary {
            reference: container.clone(),
            running: false,
        });
        state.mounts.insert(container.name(), mounts.to_vec());
        Ok(())
    }

    async fn start_container(&self, container: &ContainerReference) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "start", container);
        match state.containers.iter_mut().find(|c| &c.reference == container) {
            Some(summary) => {
                summary.running = true;
                Ok(())
            }
            None => Err(failure(&format!("no container {container}"))),
        }
    }

    async fn wait_container(&self, container: &ContainerReference) -> Result<i64> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "wait", container);
        if let Some(summary) = state.containers.iter_mut().find(|c| &c.reference == container) {
            summary.running = false;
        }
        Ok(state.exit_code)
    }

    async fn remove_container(&self, container: &ContainerReference) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "remove", container);
        if state.fail_container_removal {
            return Err(failure(&format!("remove {container}")));
        }
        state.containers.retain(|c| &c.reference != container);
        Ok(())
    }

    async fn create_volume(&self, volume: &VolumeReference) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "create-volume", volume);
        if !state.volumes.contains(volume) {
            state.volumes.push(volume.clone());
        }
        Ok(())
    }

    async fn remove_volume(&self, volume: &VolumeReference) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "remove-volume", volume);
        state.volumes.retain(|v| v != volume);
        Ok(())
    }

    async fn network_exists(&self, _name: &str) -> Result<bool> {
        Ok(self.state.lock().expect("lock").network)
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().expect("lock");
        self.record(&mut state, "create-network", name);
        state.network = true;
        Ok(())
    }
}

pub fn lifecycle(runtime: Arc<FakeRuntime>, limit: usize) -> ResourceLifecycleManager {
    ResourceLifecycleManager::new(runtime, BoundedTaskPool::new(limit))
}

/// Workers that act on the local filesystem.
///
/// Processors write `<entity id>.txt` and `shared.txt` into their write
/// directory. Plugins append their entity id to `plugins.log`. The merger
/// overlays directories with [`merge_files`].
#[derive(Default)]
pub struct FakeWorkers {
    pub ready: Mutex<Vec<String>>,
    pub not_ready: HashSet<String>,
    pub failing_processors: HashSet<String>,
    pub merges: Mutex<Vec<MergeRequest>>,
    pub plugs: Mutex<Vec<(String, PlugRequest)>>,
}

impl FakeWorkers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ready_containers(&self) -> Vec<String> {
        let mut ready = self.ready.lock().expect("lock").clone();
        ready.sort();
        ready
    }

    pub fn plugged(&self) -> Vec<String> {
        self.plugs
            .lock()
            .expect("lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl WorkerApi for FakeWorkers {
    async fn wait_ready(&self, container: &ContainerReference) -> Result<()> {
        let name = container.name();
        if self.not_ready.contains(&name) {
            return Err(CoordinatorError::ReadinessTimeout {
                endpoint: name,
                attempts: 1,
            });
        }
        self.ready.lock().expect("lock").push(name);
        Ok(())
    }

    async fn process(
        &self,
        container: &ContainerReference,
        request: &ProcessRequest,
    ) -> Result<ProcessResponse> {
        if self.failing_processors.contains(&container.entity_id) {
            return Err(CoordinatorError::UnexpectedStatus {
                url: container.name(),
                status: 500,
                body: "processor crashed".to_string(),
            });
        }
        let out = Path::new(&request.write_dir);
        fs::create_dir_all(out)?;
        fs::write(out.join(format!("{}.txt", container.entity_id)), &request.read_dir)?;
        fs::write(out.join("shared.txt"), &container.entity_id)?;
        Ok(ProcessResponse {
            output_dir: request.write_dir.clone(),
        })
    }

    async fn plug(&self, container: &ContainerReference, request: &PlugRequest) -> Result<()> {
        let log = Path::new(&request.directory).join("plugins.log");
        let mut content = fs::read_to_string(&log).unwrap_or_default();
        content.push_str(&container.entity_id);
        content.push('\n');
        fs::write(&log, content)?;
        self.plugs
            .lock()
            .expect("lock")
            .push((container.name(), request.clone()));
        Ok(())
    }

    async fn merge(
        &self,
        _container: &ContainerReference,
        _session: &str,
        request: &MergeRequest,
    ) -> Result<StandardResponse> {
        merge_files(&request.from_dirs, Path::new(&request.to_dir))?;
        self.merges.lock().expect("lock").push(request.clone());
        Ok(StandardResponse {
            status: "OK".to_string(),
        })
    }
}

/// A registry where version `n` of `user/name` has id `<name>-v<n>`.
pub struct FakeRegistry {
    latest: HashMap<String, u32>,
}

impl FakeRegistry {
    pub fn new(entries: &[(&str, u32)]) -> Arc<Self> {
        Arc::new(Self {
            latest: entries.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        })
    }

    pub fn id(name: &str, version: u32) -> String {
        format!("{name}-v{version}")
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn get_version(
        &self,
        _kind: EntityKind,
        username: &str,
        name: &str,
        version: VersionSelector,
    ) -> Result<RegistryVersion> {
        let latest = *self.latest.get(name).ok_or_else(|| CoordinatorError::UnexpectedStatus {
            url: format!("{username}/{name}"),
            status: 404,
            body: "not found".to_string(),
        })?;
        let version = match version {
            VersionSelector::Latest => latest,
            VersionSelector::Exact(v) => v,
        };
        Ok(RegistryVersion {
            principal: RegistryVersionPrincipal {
                id: Self::id(name, version),
                version,
                docker_reference: format!("cyan/{name}"),
                docker_tag: version.to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
    }
}

pub fn pinned(id: &str) -> PinnedVersion {
    PinnedVersion {
        id: id.to_string(),
        docker_reference: format!("docker.io/cyan/{id}"),
        docker_sha: format!("sha256:{id}"),
        ..Default::default()
    }
}

pub fn template(processors: &[&str], plugins: &[&str]) -> TemplateVersion {
    TemplateVersion {
        principal: TemplateVersionPrincipal {
            id: TEMPLATE_ID.to_string(),
            blob_docker_reference: "docker.io/cyan/blob".to_string(),
            blob_docker_sha: "sha256:blob".to_string(),
            template_docker_reference: "docker.io/cyan/template".to_string(),
            template_docker_sha: "sha256:template".to_string(),
            ..Default::default()
        },
        processors: processors.iter().map(|id| pinned(id)).collect(),
        plugins: plugins.iter().map(|id| pinned(id)).collect(),
        ..Default::default()
    }
}
