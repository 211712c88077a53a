use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::error::{BatchFailure, CoordinatorError, Result};
use crate::execution::{SESSION_MOUNT_PATH, TEMPLATE_MOUNT_PATH};
use crate::naming::{validate_session_id, ContainerReference, ContainerRole};
use crate::pipeline::build::{BuildRequest, PluginInvocation, ProcessorInvocation};
use crate::registry::{EntityKind, ResolvedEntity, VersionResolver};
use crate::scheduler::{collect_batch, BoundedTaskPool};
use crate::template::{PinnedVersion, TemplateVersion};
use crate::worker::{MergeRequest, PlugRequest, ProcessRequest, WorkerApi};

/// Runs a build through a started session: processors, merge, plugins.
pub struct PipelineMerger {
    resolver: VersionResolver,
    workers: Arc<dyn WorkerApi>,
    pool: BoundedTaskPool,
    read_dir: String,
    area_dir: String,
}

impl PipelineMerger {
    pub fn new(resolver: VersionResolver, workers: Arc<dyn WorkerApi>, pool: BoundedTaskPool) -> Self {
        Self {
            resolver,
            workers,
            pool,
            read_dir: TEMPLATE_MOUNT_PATH.to_string(),
            area_dir: SESSION_MOUNT_PATH.to_string(),
        }
    }

    /// Overrides the template and session paths as workers see them.
    pub fn with_workspace(mut self, read_dir: impl Into<String>, area_dir: impl Into<String>) -> Self {
        self.read_dir = read_dir.into();
        self.area_dir = area_dir.into();
        self
    }

    /// Executes a build and returns the directory holding the final tree.
    ///
    /// 1. Every processor runs concurrently (bounded), each writing to its
    ///    own fresh directory. Any failure aborts the build.
    /// 2. The merger overlays the processor outputs, in invocation order,
    ///    into a fresh merge directory.
    /// 3. Plugins are resolved concurrently, then run one by one in
    ///    declaration order against the merge directory.
    ///
    /// # Errors
    ///
    /// Stage 1 and plugin resolution report every failure. The merge call
    /// and plugin runs report the first failure.
    pub async fn merge(&self, session: &str, request: &BuildRequest) -> Result<String, BatchFailure> {
        validate_session_id(session)?;
        let template = &request.template;

        info!(session = %session, processors = request.cyan.processors.len(), "Running processors");
        let results = self
            .pool
            .run(request.cyan.processors.clone(), |invocation| async move {
                self.run_processor(session, template, invocation).await
            })
            .await;
        let output_dirs = collect_batch(results).map_err(|e| {
            error!(session = %session, errors = e.len(), "Processors failed");
            e
        })?;

        let merge_dir = self.fresh_dir();
        let merger = ContainerReference::new(ContainerRole::Merger, request.merger_id.clone())
            .with_session(session);
        info!(session = %session, to = %merge_dir, sources = output_dirs.len(), "Merging processor outputs");
        let merge_request = MergeRequest {
            from_dirs: output_dirs,
            to_dir: merge_dir.clone(),
            template: template.clone(),
        };
        let status = self.workers.merge(&merger, session, &merge_request).await?;
        info!(session = %session, status = %status.status, "Processor outputs merged");

        let plugins = self.resolve_plugins(template, &request.cyan.plugins).await?;
        for (plugin, invocation) in plugins.iter().zip(&request.cyan.plugins) {
            let container = ContainerReference::new(ContainerRole::Plugin, plugin.id.clone())
                .with_session(session);
            info!(session = %session, plugin = %plugin.reference, "Running plugin");
            self.workers
                .plug(
                    &container,
                    &PlugRequest {
                        directory: merge_dir.clone(),
                        config: invocation.config.clone(),
                    },
                )
                .await?;
        }

        info!(session = %session, output = %merge_dir, "Build complete");
        Ok(merge_dir)
    }

    async fn run_processor(
        &self,
        session: &str,
        template: &TemplateVersion,
        invocation: ProcessorInvocation,
    ) -> Result<String> {
        let resolved = self
            .resolve_allowed(EntityKind::Processor, &invocation.name, &template.processors, template)
            .await?;

        let container =
            ContainerReference::new(ContainerRole::Processor, resolved.id.clone()).with_session(session);
        let request = ProcessRequest {
            read_dir: self.read_dir.clone(),
            write_dir: self.fresh_dir(),
            globs: invocation.files,
            config: invocation.config,
        };

        let response = self.workers.process(&container, &request).await?;
        info!(session = %session, processor = %resolved.reference, output = %response.output_dir, "Processor completed");
        Ok(response.output_dir)
    }

    async fn resolve_plugins(
        &self,
        template: &TemplateVersion,
        invocations: &[PluginInvocation],
    ) -> Result<Vec<ResolvedEntity>, BatchFailure> {
        let results = self
            .pool
            .run(invocations.to_vec(), |invocation| async move {
                self.resolve_allowed(EntityKind::Plugin, &invocation.name, &template.plugins, template)
                    .await
            })
            .await;
        collect_batch(results)
    }

    /// Resolves a reference and checks the result is pinned by the template.
    async fn resolve_allowed(
        &self,
        kind: EntityKind,
        raw: &str,
        allow_list: &[PinnedVersion],
        template: &TemplateVersion,
    ) -> Result<ResolvedEntity> {
        let resolved = self
            .resolver
            .resolve_str(kind, raw, allow_list, template.id())
            .await?;
        if !allow_list.iter().any(|p| p.id == resolved.id) {
            return Err(CoordinatorError::NotInTemplate {
                kind: kind.to_string(),
                id: resolved.id,
                template: template.id().to_string(),
            });
        }
        Ok(resolved)
    }

    fn fresh_dir(&self) -> String {
        format!("{}/{}", self.area_dir.trim_end_matches('/'), Uuid::new_v4())
    }
}
