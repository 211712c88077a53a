//! Build request types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::TemplateVersion;
use crate::worker::GlobSelector;

/// A processor call requested by a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorInvocation {
    /// Registry reference, `username/name[:version]`.
    pub name: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub files: Vec<GlobSelector>,
}

/// A plugin call requested by a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInvocation {
    /// Registry reference, `username/name[:version]`.
    pub name: String,
    #[serde(default)]
    pub config: Value,
}

/// The processors and plugins a build runs, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub processors: Vec<ProcessorInvocation>,
    #[serde(default)]
    pub plugins: Vec<PluginInvocation>,
}

/// A full build: template, invocations and the merger to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub template: TemplateVersion,
    pub cyan: BuildPlan,
    pub merger_id: String,
}
