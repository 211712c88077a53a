//! Deterministic naming of runtime resources.
//!
//! Containers and volumes are named from the entity they serve so that a
//! listing of the runtime can be mapped back to entities without any
//! persisted state:
//!
//! ```text
//! container: cyan-<role>-<entityId without dashes>[-<session>]
//! volume:    cyan-<entityId without dashes>[-<session>]
//! ```
//!
//! Entity ids are UUIDs; dashes are stripped on encode and re-inserted on
//! decode. Session ids must never contain the separator, see
//! [`validate_session_id`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

/// Prefix of every resource name owned by the coordinator.
pub const NAME_PREFIX: &str = "cyan";

const SEPARATOR: char = '-';

/// Role a container plays in a session or template deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    Template,
    Processor,
    Plugin,
    Merger,
    /// Ephemeral helper that unpacks a template blob into a volume.
    Unzip,
}

impl ContainerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Processor => "processor",
            Self::Plugin => "plugin",
            Self::Merger => "merger",
            Self::Unzip => "volume",
        }
    }

    /// HTTP port the role's service listens on, if it serves one.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Template => Some(5550),
            Self::Processor => Some(5551),
            Self::Plugin => Some(5552),
            Self::Merger => Some(9000),
            Self::Unzip => None,
        }
    }
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerRole {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "template" => Ok(Self::Template),
            "processor" => Ok(Self::Processor),
            "plugin" => Ok(Self::Plugin),
            "merger" => Ok(Self::Merger),
            "volume" => Ok(Self::Unzip),
            other => Err(CoordinatorError::InvalidName(format!("unknown role '{other}'"))),
        }
    }
}

/// Removes every dash from an entity id.
pub fn strip_dashes(id: &str) -> String {
    id.replace(SEPARATOR, "")
}

/// Restores canonical `8-4-4-4-12` UUID form for 32 hex characters.
///
/// Any other input is returned unchanged.
pub fn insert_dashes(id: &str) -> String {
    if id.len() != 32 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

/// Checks that a session id can be embedded in a resource name.
///
/// # Errors
///
/// Returns `CoordinatorError::InvalidSession` for empty ids and ids with
/// characters outside `[A-Za-z0-9_.]`, including the `-` separator.
pub fn validate_session_id(session: &str) -> Result<()> {
    let valid = !session.is_empty()
        && session
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(CoordinatorError::InvalidSession(session.to_string()))
    }
}

fn session_suffix(session: &Option<String>) -> String {
    match session.as_deref() {
        Some(s) if !s.is_empty() => format!("{SEPARATOR}{s}"),
        _ => String::new(),
    }
}

/// An image identified by repository plus tag, optionally pinned by digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// The part of an image reference that decides whether two images are the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageIdentity {
    pub repository: String,
    /// Digest when pinned, otherwise the tag.
    pub pin: String,
}

impl ImageReference {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            digest: None,
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        let digest = digest.into();
        self.digest = if digest.is_empty() { None } else { Some(digest) };
        self
    }

    /// Builds a reference from registry fields, where an empty tag means `latest`.
    pub fn pinned(repository: &str, tag: Option<&str>, digest: Option<&str>) -> Self {
        let tag = tag.filter(|t| !t.is_empty()).unwrap_or("latest");
        let image = Self::new(repository, tag);
        match digest {
            Some(d) => image.with_digest(d),
            None => image,
        }
    }

    /// Parses `repo:tag`, `repo@digest` or a bare `repo` (tag `latest`).
    ///
    /// A colon before the last `/` belongs to a registry host, not a tag.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CoordinatorError::InvalidName(s.to_string()));
        }
        if let Some((repository, digest)) = s.split_once('@') {
            if repository.is_empty() || digest.is_empty() {
                return Err(CoordinatorError::InvalidName(s.to_string()));
            }
            return Ok(Self::new(repository, "").with_digest(digest));
        }
        let last_slash = s.rfind('/').map(|i| i + 1).unwrap_or(0);
        match s[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let (repository, tag) = (&s[..split], &s[split + 1..]);
                if repository.is_empty() || tag.is_empty() {
                    return Err(CoordinatorError::InvalidName(s.to_string()));
                }
                Ok(Self::new(repository, tag))
            }
            None => Ok(Self::new(s, "latest")),
        }
    }

    /// The string handed to the runtime when pulling or creating from this image.
    pub fn reference(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.repository, digest),
            None => format!("{}:{}", self.repository, self.tag),
        }
    }

    pub fn identity(&self) -> ImageIdentity {
        ImageIdentity {
            repository: self.repository.clone(),
            pin: self.digest.clone().unwrap_or_else(|| self.tag.clone()),
        }
    }

    /// Whether a locally listed image satisfies this one.
    ///
    /// The listed repository may be a suffix of the wanted one, since the
    /// runtime drops default registry prefixes from its listings.
    pub fn is_satisfied_by(&self, listed: &ImageReference) -> bool {
        if listed.repository.is_empty() || !self.repository.ends_with(&listed.repository) {
            return false;
        }
        match (&self.digest, &listed.digest) {
            (Some(wanted), Some(have)) => wanted == have,
            (Some(_), None) => false,
            (None, _) => self.tag == listed.tag,
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Identifies a container by role, entity and optional session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerReference {
    pub role: ContainerRole,
    pub entity_id: String,
    pub session: Option<String>,
}

impl ContainerReference {
    pub fn new(role: ContainerRole, entity_id: impl Into<String>) -> Self {
        Self {
            role,
            entity_id: entity_id.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn name(&self) -> String {
        format!(
            "{NAME_PREFIX}{SEPARATOR}{}{SEPARATOR}{}{}",
            self.role,
            strip_dashes(&self.entity_id),
            session_suffix(&self.session)
        )
    }

    /// Decodes a container name produced by [`ContainerReference::name`].
    ///
    /// A leading `/`, as the runtime reports names, is ignored.
    pub fn parse_name(name: &str) -> Result<Self> {
        let trimmed = name.trim_start_matches('/');
        let parts: Vec<&str> = trimmed.split(SEPARATOR).collect();
        if !(3..=4).contains(&parts.len())
            || parts[0] != NAME_PREFIX
            || parts.iter().any(|p| p.is_empty())
        {
            return Err(CoordinatorError::InvalidName(name.to_string()));
        }
        let role = parts[1]
            .parse::<ContainerRole>()
            .map_err(|_| CoordinatorError::InvalidName(name.to_string()))?;
        Ok(Self {
            role,
            entity_id: insert_dashes(parts[2]),
            session: parts.get(3).map(|s| s.to_string()),
        })
    }

    pub fn in_session(&self, session: &str) -> bool {
        self.session.as_deref() == Some(session)
    }
}

impl fmt::Display for ContainerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Identifies a volume by entity and optional session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeReference {
    pub entity_id: String,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl VolumeReference {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn name(&self) -> String {
        format!(
            "{NAME_PREFIX}{SEPARATOR}{}{}",
            strip_dashes(&self.entity_id),
            session_suffix(&self.session)
        )
    }

    /// Decodes a volume name produced by [`VolumeReference::name`].
    pub fn parse_name(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split(SEPARATOR).collect();
        if !(2..=3).contains(&parts.len())
            || parts[0] != NAME_PREFIX
            || parts.iter().any(|p| p.is_empty())
        {
            return Err(CoordinatorError::InvalidName(name.to_string()));
        }
        Ok(Self {
            entity_id: insert_dashes(parts[1]),
            session: parts.get(2).map(|s| s.to_string()),
        })
    }

    pub fn in_session(&self, session: &str) -> bool {
        self.session.as_deref() == Some(session)
    }
}

impl fmt::Display for VolumeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
