use std::fmt;
use std::str::FromStr;

use crate::error::CoordinatorError;

/// The kinds of registry entity a build can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Processor,
    Plugin,
}

impl EntityKind {
    /// Path segment of the kind in registry URLs.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Processor => "Processor",
            Self::Plugin => "Plugin",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processor => f.write_str("processor"),
            Self::Plugin => f.write_str("plugin"),
        }
    }
}

/// A `username/name` reference with an optional `:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryReference {
    pub username: String,
    pub name: String,
    pub version: Option<u32>,
}

impl FromStr for RegistryReference {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordinatorError::InvalidReference(s.to_string());

        let (path, version) = match s.split_once(':') {
            Some((path, version)) => {
                let version = version.parse::<u32>().map_err(|_| invalid())?;
                (path, Some(version))
            }
            None => (s, None),
        };

        let (username, name) = path.split_once('/').ok_or_else(invalid)?;
        if username.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            username: username.to_string(),
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for RegistryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.name)?;
        if let Some(version) = self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}
