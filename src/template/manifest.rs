//! Template version manifests.
//!
//! A manifest describes one published template version: the images that
//! carry its content and its runtime, and the processor and plugin versions
//! it pins. The pinned lists are the allow-list every build is checked
//! against.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::naming::{ImageReference, VolumeReference};

/// A published template version and everything it depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateVersion {
    pub principal: TemplateVersionPrincipal,
    pub template: TemplateInfo,
    pub plugins: Vec<PinnedVersion>,
    pub processors: Vec<PinnedVersion>,
}

/// Identity and images of a template version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateVersionPrincipal {
    pub id: String,
    pub version: i64,
    pub created_at: String,
    pub description: String,
    /// Image holding the template's content archive.
    pub blob_docker_reference: String,
    pub blob_docker_sha: String,
    /// Image of the long-lived template service.
    pub template_docker_reference: String,
    pub template_docker_sha: String,
}

/// Descriptive metadata of the template itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub project: String,
    pub source: String,
    pub email: String,
    pub tags: Vec<String>,
    pub description: String,
    pub readme: String,
    pub user_id: String,
}

/// A processor or plugin version pinned by a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PinnedVersion {
    pub id: String,
    pub version: i64,
    pub created_at: String,
    pub description: String,
    pub docker_reference: String,
    pub docker_sha: String,
}

impl PinnedVersion {
    pub fn image(&self) -> ImageReference {
        ImageReference::pinned(&self.docker_reference, None, Some(&self.docker_sha))
    }
}

impl TemplateVersionPrincipal {
    pub fn blob_image(&self) -> ImageReference {
        ImageReference::pinned(&self.blob_docker_reference, None, Some(&self.blob_docker_sha))
    }

    pub fn runtime_image(&self) -> ImageReference {
        ImageReference::pinned(
            &self.template_docker_reference,
            None,
            Some(&self.template_docker_sha),
        )
    }
}

impl TemplateVersion {
    /// The template version id, which names its volumes and containers.
    pub fn id(&self) -> &str {
        &self.principal.id
    }

    /// The volume holding the unpacked template content, shared by all sessions.
    pub fn template_volume(&self) -> VolumeReference {
        VolumeReference::new(self.id())
    }

    /// The writable working volume of one session.
    pub fn session_volume(&self, session: &str) -> VolumeReference {
        VolumeReference::new(self.id()).with_session(session)
    }

    pub fn find_processor(&self, id: &str) -> Option<&PinnedVersion> {
        self.processors.iter().find(|p| p.id == id)
    }

    pub fn find_plugin(&self, id: &str) -> Option<&PinnedVersion> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// Images of every pinned processor and plugin.
    pub fn dependency_images(&self) -> Vec<ImageReference> {
        self.processors
            .iter()
            .chain(self.plugins.iter())
            .map(PinnedVersion::image)
            .collect()
    }

    /// Loads a manifest from a JSON or YAML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        load_document(path)
    }
}

/// Reads a JSON or YAML document. `.yaml` and `.yml` files are parsed as YAML.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}
