//! HTTP client for the entity registry.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::http::{build_client, decode_json};
use crate::naming::ImageReference;
use crate::registry::reference::EntityKind;

/// Which version of an entity to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(u32),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// One version of a processor or plugin as returned by the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryVersion {
    pub principal: RegistryVersionPrincipal,
    #[serde(rename = "plugin", alias = "processor", default)]
    pub entity: RegistryEntity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryVersionPrincipal {
    pub id: String,
    pub version: u32,
    pub created_at: String,
    pub description: String,
    #[serde(rename = "dockerReference")]
    pub docker_reference: String,
    #[serde(rename = "dockerTag")]
    pub docker_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEntity {
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

impl RegistryVersion {
    /// The image the registry advertises for this version.
    pub fn image(&self) -> ImageReference {
        ImageReference::pinned(
            &self.principal.docker_reference,
            Some(&self.principal.docker_tag),
            None,
        )
    }
}

/// Version lookups against the registry.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn get_version(
        &self,
        kind: EntityKind,
        username: &str,
        name: &str,
        version: VersionSelector,
    ) -> Result<RegistryVersion>;
}

/// reqwest-backed registry client.
pub struct RegistryClient {
    http: Client,
    endpoint: String,
}

impl RegistryClient {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Result<Self> {
        Ok(Self::new(
            build_client(config.request_timeout)?,
            config.registry_endpoint.clone(),
        ))
    }

    /// `{endpoint}/api/v1/{Kind}/slug/{username}/{name}/versions/{version|latest}`
    pub fn version_url(
        &self,
        kind: EntityKind,
        username: &str,
        name: &str,
        version: VersionSelector,
    ) -> String {
        format!(
            "{}/api/v1/{}/slug/{}/{}/versions/{}",
            self.endpoint,
            kind.path_segment(),
            urlencoding::encode(username),
            urlencoding::encode(name),
            version
        )
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn get_version(
        &self,
        kind: EntityKind,
        username: &str,
        name: &str,
        version: VersionSelector,
    ) -> Result<RegistryVersion> {
        let url = self.version_url(kind, username, name, version);
        debug!(url = %url, kind = %kind, "Fetching registry version");

        let response = self.http.get(&url).send().await?;
        decode_json(response, &url).await
    }
}
