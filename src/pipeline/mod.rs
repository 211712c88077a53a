//! Build execution for a started session.
//!
//! This module provides the three-stage build pipeline and its request
//! types:
//!
//! ```text
//! processors (concurrent) ──► merger overlay ──► plugins (sequential)
//!   /workspace/area/<uuid>      /workspace/area/<uuid>   in place
//! ```
//!
//! [`merge_files`] is the overlay the merger container performs on its side.
//!
//! # Example
//!
//! ```ignore
//! use cyanprint_coordinator::pipeline::{BuildRequest, PipelineMerger};
//!
//! let merger = PipelineMerger::new(resolver, workers, pool);
//! let output_dir = merger.merge("s1", &request).await?;
//! ```

pub mod build;
pub mod merger;
pub mod overlay;

pub use build::{BuildPlan, BuildRequest, PluginInvocation, ProcessorInvocation};
pub use merger::PipelineMerger;
pub use overlay::merge_files;
