//! Registry lookups for processors and plugins.
//!
//! This module provides functionality for:
//! - Parsing `username/name[:version]` references
//! - Fetching entity versions from the registry HTTP API
//! - Resolving references against a template's pinned allow-list

pub mod client;
pub mod reference;
pub mod resolver;

pub use client::{
    RegistryApi, RegistryClient, RegistryEntity, RegistryVersion, RegistryVersionPrincipal,
    VersionSelector,
};
pub use reference::{EntityKind, RegistryReference};
pub use resolver::{ResolvedEntity, VersionResolver};
