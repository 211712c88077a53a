//! Resolving registry references to concrete, template-approved versions.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CoordinatorError, Result};
use crate::naming::ImageReference;
use crate::registry::client::{RegistryApi, RegistryVersion, VersionSelector};
use crate::registry::reference::{EntityKind, RegistryReference};
use crate::template::PinnedVersion;

/// A processor or plugin version chosen for a build.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    /// Version id, which names the entity's session container.
    pub id: String,
    pub kind: EntityKind,
    pub reference: RegistryReference,
    pub version: u32,
    pub image: ImageReference,
}

impl ResolvedEntity {
    fn from_registry(kind: EntityKind, reference: &RegistryReference, found: &RegistryVersion) -> Self {
        Self {
            id: found.principal.id.clone(),
            kind,
            reference: reference.clone(),
            version: found.principal.version,
            image: found.image(),
        }
    }

    fn from_pinned(
        kind: EntityKind,
        reference: &RegistryReference,
        version: u32,
        pinned: &PinnedVersion,
    ) -> Self {
        Self {
            id: pinned.id.clone(),
            kind,
            reference: reference.clone(),
            version,
            image: pinned.image(),
        }
    }
}

/// Maps references to versions using the registry and a template allow-list.
#[derive(Clone)]
pub struct VersionResolver {
    registry: Arc<dyn RegistryApi>,
}

impl VersionResolver {
    pub fn new(registry: Arc<dyn RegistryApi>) -> Self {
        Self { registry }
    }

    /// Parses and resolves a raw `username/name[:version]` string.
    pub async fn resolve_str(
        &self,
        kind: EntityKind,
        raw: &str,
        allow_list: &[PinnedVersion],
        template_id: &str,
    ) -> Result<ResolvedEntity> {
        let reference: RegistryReference = raw.parse()?;
        self.resolve(kind, &reference, allow_list, template_id).await
    }

    /// Resolves a reference to one concrete version.
    ///
    /// An explicit version is taken from the registry as-is. Without one, the
    /// newest version whose id appears in `allow_list` wins, scanning from
    /// the latest version down to 1.
    ///
    /// # Errors
    ///
    /// Registry transport errors propagate. `CoordinatorError::VersionMismatch`
    /// is returned when no version is in the allow-list.
    pub async fn resolve(
        &self,
        kind: EntityKind,
        reference: &RegistryReference,
        allow_list: &[PinnedVersion],
        template_id: &str,
    ) -> Result<ResolvedEntity> {
        if let Some(version) = reference.version {
            let found = self
                .registry
                .get_version(kind, &reference.username, &reference.name, VersionSelector::Exact(version))
                .await?;
            debug!(reference = %reference, id = %found.principal.id, "Resolved explicit version");
            return Ok(ResolvedEntity::from_registry(kind, reference, &found));
        }

        let pinned = |id: &str| allow_list.iter().find(|p| p.id == id);

        let latest = self
            .registry
            .get_version(kind, &reference.username, &reference.name, VersionSelector::Latest)
            .await?;
        if let Some(entry) = pinned(&latest.principal.id) {
            info!(reference = %reference, version = latest.principal.version, "Resolved to latest version");
            return Ok(ResolvedEntity::from_pinned(kind, reference, latest.principal.version, entry));
        }

        for version in (1..latest.principal.version).rev() {
            let found = self
                .registry
                .get_version(kind, &reference.username, &reference.name, VersionSelector::Exact(version))
                .await?;
            if let Some(entry) = pinned(&found.principal.id) {
                info!(reference = %reference, version, "Resolved to pinned version");
                return Ok(ResolvedEntity::from_pinned(kind, reference, version, entry));
            }
        }

        Err(CoordinatorError::VersionMismatch {
            reference: reference.to_string(),
            template: template_id.to_string(),
        })
    }
}
