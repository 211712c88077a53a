//! Integration tests against a real Docker daemon.
//!
//! These tests create and remove labelled resources on the local daemon.
//! Run with: cargo test --test docker_integration -- --ignored

use std::sync::Arc;

use cyanprint_coordinator::execution::{ContainerRuntime, DockerClient, ResourceLifecycleManager};
use cyanprint_coordinator::naming::VolumeReference;
use cyanprint_coordinator::scheduler::BoundedTaskPool;

fn create_test_client() -> DockerClient {
    DockerClient::new().expect("Docker daemon must be reachable for integration tests")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test docker_integration -- --ignored
async fn test_ensure_network_is_idempotent() {
    let runtime = Arc::new(create_test_client());
    let lifecycle = ResourceLifecycleManager::new(runtime.clone(), BoundedTaskPool::new(2));

    lifecycle.ensure_network().await.expect("first ensure");
    lifecycle.ensure_network().await.expect("second ensure");

    assert!(runtime.network_exists("cyanprint").await.expect("inspect networks"));
}

#[tokio::test]
#[ignore]
async fn test_volume_roundtrip_is_listed_by_label() {
    let runtime = create_test_client();
    let volume = VolumeReference::new("integration").with_session("docker_test");

    runtime.create_volume(&volume).await.expect("create volume");
    let listed = runtime.list_volumes().await.expect("list volumes");
    assert!(listed.contains(&volume), "Labelled volume should be listed");

    runtime.remove_volume(&volume).await.expect("remove volume");
    let listed = runtime.list_volumes().await.expect("list volumes");
    assert!(!listed.contains(&volume));
}

#[tokio::test]
#[ignore]
async fn test_list_images_decodes_local_images() {
    let runtime = create_test_client();
    let images = runtime.list_images().await.expect("list images");
    assert!(images.iter().all(|i| !i.repository.is_empty()));
}
