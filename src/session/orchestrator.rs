use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{BatchFailure, CoordinatorError};
use crate::execution::mounts::worker_mounts;
use crate::execution::ResourceLifecycleManager;
use crate::naming::{
    validate_session_id, ContainerReference, ContainerRole, ImageReference, VolumeReference,
};
use crate::scheduler::collect_batch;
use crate::template::{PinnedVersion, TemplateVersion};
use crate::worker::WorkerApi;

/// Everything Start needs to bring a session's workers up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlan {
    pub session: String,
    pub template: TemplateVersion,
    /// Template content, mounted read-only.
    pub read_volume: VolumeReference,
    /// Session working volume, mounted read-write.
    pub write_volume: VolumeReference,
    pub merger_id: String,
}

impl StartPlan {
    /// The usual plan: the template's shared volume in, the session volume out.
    pub fn for_template(
        session: impl Into<String>,
        template: TemplateVersion,
        merger_id: impl Into<String>,
    ) -> Self {
        let session = session.into();
        Self {
            read_volume: template.template_volume(),
            write_volume: template.session_volume(&session),
            session,
            template,
            merger_id: merger_id.into(),
        }
    }
}

/// Images in `wanted` with no identical image in `present`.
///
/// Identity is repository plus digest when pinned, otherwise repository plus
/// tag. Duplicates in `wanted` are reported once, in first-seen order.
///
/// Repositories must match exactly. Docker lists `docker.io/` images without
/// that prefix, so pin unprefixed references to avoid pulling them again.
pub fn missing_images(wanted: &[ImageReference], present: &[ImageReference]) -> Vec<ImageReference> {
    let present: HashSet<_> = present.iter().map(ImageReference::identity).collect();
    let mut seen = HashSet::new();
    wanted
        .iter()
        .filter(|image| {
            let identity = image.identity();
            !present.contains(&identity) && seen.insert(identity)
        })
        .cloned()
        .collect()
}

/// Prepares, starts and tears down the per-session resources of a build.
pub struct SessionOrchestrator {
    lifecycle: ResourceLifecycleManager,
    workers: Arc<dyn WorkerApi>,
}

impl SessionOrchestrator {
    pub fn new(lifecycle: ResourceLifecycleManager, workers: Arc<dyn WorkerApi>) -> Self {
        Self { lifecycle, workers }
    }

    /// Pulls the template's missing processor and plugin images and creates
    /// the session volume, both concurrently.
    ///
    /// The session volume reference is returned whatever the outcome, so a
    /// partly warmed session can still be cleaned.
    ///
    /// # Errors
    ///
    /// The second element holds the union of pull and volume errors. An
    /// invalid session id or a failed image listing aborts before any work
    /// starts.
    pub async fn warm(
        &self,
        session: &str,
        template: &TemplateVersion,
    ) -> (VolumeReference, Result<(), BatchFailure>) {
        let volume = template.session_volume(session);
        let outcome = self.warm_volume(session, template, &volume).await;
        (volume, outcome)
    }

    async fn warm_volume(
        &self,
        session: &str,
        template: &TemplateVersion,
        volume: &VolumeReference,
    ) -> Result<(), BatchFailure> {
        validate_session_id(session)?;
        info!(session = %session, template = %template.id(), "Warming session");

        let present = self.lifecycle.list_images().await?;
        let missing = missing_images(&template.dependency_images(), &present);

        let (pulled, created) = tokio::join!(
            self.lifecycle.pull_images(missing),
            self.lifecycle.create_volume(volume),
        );

        let mut failure = BatchFailure::default();
        if let Err(e) = pulled {
            failure.extend(e);
        }
        if let Err(e) = created {
            failure.errors.push(e);
        }
        if !failure.is_empty() {
            error!(session = %session, errors = failure.len(), "Session warm-up failed");
        }
        failure.into_result(())
    }

    /// Launches one container per pinned processor and plugin plus one
    /// merger, and waits for each to answer its liveness route.
    ///
    /// The three groups start concurrently. Each container is created,
    /// started and probed in turn.
    ///
    /// # Errors
    ///
    /// Returns the union of every launch and readiness failure.
    pub async fn start(&self, plan: &StartPlan) -> Result<(), BatchFailure> {
        validate_session_id(&plan.session)?;
        info!(session = %plan.session, template = %plan.template.id(), "Starting session");

        let (processors, plugins, merger) = tokio::join!(
            self.start_group(plan, ContainerRole::Processor, &plan.template.processors),
            self.start_group(plan, ContainerRole::Plugin, &plan.template.plugins),
            self.start_merger(plan),
        );

        let mut failure = BatchFailure::default();
        for group in [processors, plugins] {
            if let Err(e) = group {
                failure.extend(e);
            }
        }
        if let Err(e) = merger {
            failure.errors.push(e);
        }
        failure.into_result(())
    }

    /// Removes every container of the session, then its volumes.
    ///
    /// Volumes are left alone if any container could not be removed, since
    /// they may still be mounted.
    ///
    /// # Errors
    ///
    /// Returns listing errors, or the container removal errors, or the
    /// volume removal errors.
    pub async fn clean(&self, session: &str) -> Result<(), BatchFailure> {
        validate_session_id(session)?;
        info!(session = %session, "Cleaning session");

        let (containers, volumes) = tokio::join!(
            self.lifecycle.list_containers(),
            self.lifecycle.list_volumes(),
        );

        let mut failure = BatchFailure::default();
        let containers = containers.unwrap_or_else(|e| {
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

        let containers: Vec<ContainerReference> = containers
            .into_iter()
            .map(|c| c.reference)
            .filter(|c| c.in_session(session))
            .collect();
        let volumes: Vec<VolumeReference> =
            volumes.into_iter().filter(|v| v.in_session(session)).collect();

        info!(
            session = %session,
            containers = containers.len(),
            volumes = volumes.len(),
            "Removing session resources"
        );

        if let Err(e) = self.lifecycle.remove_containers(containers).await {
            error!(session = %session, errors = e.len(), "Container removal failed, keeping volumes");
            return Err(e);
        }

        self.lifecycle.remove_volumes(volumes).await
    }

    async fn start_group(
        &self,
        plan: &StartPlan,
        role: ContainerRole,
        entries: &[PinnedVersion],
    ) -> Result<(), BatchFailure> {
        let results = self
            .lifecycle
            .pool()
            .run(entries.to_vec(), |entry| async move {
                let container = ContainerReference::new(role, entry.id.clone())
                    .with_session(plan.session.clone());
                self.launch_worker(plan, &container, &entry.image()).await
            })
            .await;
        collect_batch(results).map(|_| ())
    }

    async fn start_merger(&self, plan: &StartPlan) -> Result<(), CoordinatorError> {
        let image = self.lifecycle.coordinator_image().await?;
        let container = ContainerReference::new(ContainerRole::Merger, plan.merger_id.clone())
            .with_session(plan.session.clone());
        self.launch_worker(plan, &container, &image).await
    }

    async fn launch_worker(
        &self,
        plan: &StartPlan,
        container: &ContainerReference,
        image: &ImageReference,
    ) -> Result<(), CoordinatorError> {
        let mounts = worker_mounts(&plan.read_volume, &plan.write_volume);
        self.lifecycle.launch(container, image, &mounts).await?;
        self.workers.wait_ready(container).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_images_by_digest_identity() {
        let wanted = vec![
            ImageReference::new("cyan/a", "latest").with_digest("sha256:1"),
            ImageReference::new("cyan/b", "latest").with_digest("sha256:2"),
            ImageReference::new("cyan/a", "latest").with_digest("sha256:1"),
        ];
        let present = vec![ImageReference::new("cyan/a", "").with_digest("sha256:1")];

        let missing = missing_images(&wanted, &present);
        assert_eq!(missing, vec![wanted[1].clone()]);
    }

    #[test]
    fn test_missing_images_none_when_all_present() {
        let wanted = vec![ImageReference::new("cyan/a", "1")];
        let present = vec![ImageReference::new("cyan/a", "1")];
        assert!(missing_images(&wanted, &present).is_empty());
        assert!(missing_images(&[], &present).is_empty());
    }

    #[test]
    fn test_missing_images_compares_repositories_exactly() {
        let wanted = vec![ImageReference::new("docker.io/cyan/a", "").with_digest("sha256:1")];
        let present = vec![ImageReference::new("cyan/a", "").with_digest("sha256:1")];
        assert_eq!(missing_images(&wanted, &present), wanted);
    }

    #[test]
    fn test_start_plan_for_template() {
        let template = TemplateVersion {
            principal: crate::template::TemplateVersionPrincipal {
                id: "tpl".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let plan = StartPlan::for_template("s1", template, "m1");
        assert_eq!(plan.read_volume, VolumeReference::new("tpl"));
        assert_eq!(plan.write_volume, VolumeReference::new("tpl").with_session("s1"));
        assert_eq!(plan.merger_id, "m1");
    }
}
