//! Template versions and their shared runtime resources.
//!
//! This module provides the template manifest types and the
//! [`TemplateWarmer`], which reconciles a template's images, content volume
//! and long-lived service container.
//!
//! # Example
//!
//! ```ignore
//! use cyanprint_coordinator::template::{TemplateVersion, TemplateWarmer};
//!
//! let template = TemplateVersion::from_file(Path::new("template.json"))?;
//! let warmer = TemplateWarmer::new(lifecycle, workers);
//! warmer.warm(&template).await?;
//! ```

pub mod manifest;
pub mod warmer;

pub use manifest::{
    load_document, PinnedVersion, TemplateInfo, TemplateVersion, TemplateVersionPrincipal,
};
pub use warmer::{MissingTemplateResources, TemplateWarmer};
