//! Container runtime layer.
//!
//! This module provides the runtime side of the coordinator: a
//! [`ContainerRuntime`] seam, its bollard-backed [`DockerClient`], the mount
//! conventions, and [`ResourceLifecycleManager`] which layers batching,
//! network setup and coordinator image discovery on top.
//!
//! # Ownership
//!
//! Every container and volume the coordinator creates carries the label
//! `cyanprint.dev=true` and is attached to the `cyanprint` bridge network.
//! Image, container and volume listings only ever see labelled resources.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cyanprint_coordinator::execution::{DockerClient, ResourceLifecycleManager};
//! use cyanprint_coordinator::scheduler::BoundedTaskPool;
//!
//! let runtime = Arc::new(DockerClient::new()?);
//! let lifecycle = ResourceLifecycleManager::new(runtime, BoundedTaskPool::new(4));
//! lifecycle.ensure_network().await?;
//! ```

pub mod docker_client;
pub mod lifecycle;
pub mod mounts;
pub mod runtime;

pub use docker_client::DockerClient;
pub use lifecycle::ResourceLifecycleManager;
pub use mounts::{VolumeMount, SESSION_MOUNT_PATH, TEMPLATE_MOUNT_PATH};
pub use runtime::{ContainerRuntime, ContainerSummary};

/// Label key marking resources owned by the coordinator.
pub const OWNER_LABEL_KEY: &str = "cyanprint.dev";

/// Label value marking resources owned by the coordinator.
pub const OWNER_LABEL_VALUE: &str = "true";

/// Bridge network every coordinator container joins.
pub const NETWORK_NAME: &str = "cyanprint";
