//! cyanprint-coordinator: container coordinator for cyanprint template builds.
//!
//! Manages the Docker images, volumes and containers that back template
//! versions and build sessions, and drives a build through processor,
//! merger and plugin workers over HTTP.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod http;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod template;
pub mod worker;

pub use config::{ConfigError, CoordinatorConfig};
pub use error::{BatchFailure, CoordinatorError, Result};
