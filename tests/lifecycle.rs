//! Integration tests for batched resource operations.

mod common;

use common::{lifecycle, FakeRuntime};
use cyanprint_coordinator::error::CoordinatorError;
use cyanprint_coordinator::execution::mounts::unzip_mounts;
use cyanprint_coordinator::naming::{ContainerReference, ContainerRole, ImageReference, VolumeReference};

#[tokio::test]
async fn test_pull_reports_each_failed_image() {
    let runtime = FakeRuntime::with_state(|s| {
        s.fail_pull.insert("cyan/b:1".to_string());
        s.fail_pull.insert("cyan/c:1".to_string());
    });
    let manager = lifecycle(runtime.clone(), 2);

    let images = vec![
        ImageReference::new("cyan/a", "1"),
        ImageReference::new("cyan/b", "1"),
        ImageReference::new("cyan/c", "1"),
    ];
    let failure = manager.pull_images(images).await.expect_err("two pulls fail");

    assert_eq!(failure.len(), 2);
    assert_eq!(runtime.calls_starting_with("pull").len(), 3);
    let present = manager.list_images().await.expect("list");
    assert_eq!(present, vec![ImageReference::new("cyan/a", "1")]);
}

#[tokio::test]
async fn test_pull_nothing_is_a_no_op() {
    let runtime = FakeRuntime::new();
    lifecycle(runtime.clone(), 2)
        .pull_images(Vec::new())
        .await
        .expect("empty pull");
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn test_run_to_completion_removes_container() {
    let runtime = FakeRuntime::new();
    let manager = lifecycle(runtime.clone(), 1);
    let helper = ContainerReference::new(ContainerRole::Unzip, "t1");
    let volume = VolumeReference::new("t1");

    manager
        .run_to_completion(&helper, &ImageReference::new("cyan/blob", "1"), &unzip_mounts(&volume))
        .await
        .expect("helper succeeds");

    let ops: Vec<String> = runtime
        .calls()
        .into_iter()
        .map(|c| c.split(' ').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ops, vec!["create", "start", "wait", "remove"]);
    assert!(runtime.container_names().is_empty());
}

#[tokio::test]
async fn test_run_to_completion_fails_on_non_zero_exit() {
    let runtime = FakeRuntime::with_state(|s| s.exit_code = 2);
    let manager = lifecycle(runtime.clone(), 1);
    let helper = ContainerReference::new(ContainerRole::Unzip, "t1");

    let err = manager
        .run_to_completion(&helper, &ImageReference::new("cyan/blob", "1"), &[])
        .await
        .expect_err("non-zero exit");

    assert!(matches!(err, CoordinatorError::ContainerExited { code: 2, .. }));
    assert_eq!(runtime.container_names(), vec!["cyan-volume-t1".to_string()]);
}

#[tokio::test]
async fn test_ensure_network_creates_once() {
    let runtime = FakeRuntime::new();
    let manager = lifecycle(runtime.clone(), 1);

    manager.ensure_network().await.expect("first");
    manager.ensure_network().await.expect("second");

    assert_eq!(runtime.calls_starting_with("create-network"), vec!["cyanprint".to_string()]);
}

#[tokio::test]
async fn test_coordinator_image_lookup() {
    let runtime = FakeRuntime::new();
    let manager = lifecycle(runtime.clone(), 1).with_coordinator_label("cyanprint.name=custom");

    let err = manager.coordinator_image().await.expect_err("no image yet");
    assert!(matches!(err, CoordinatorError::MissingImage(label) if label == "cyanprint.name=custom"));

    let image = ImageReference::new("cyan/boron", "2");
    runtime.state.lock().expect("lock").coordinator_image = Some(image.clone());
    assert_eq!(manager.coordinator_image().await.expect("found"), image);
}

#[tokio::test]
async fn test_remove_volumes_in_batch() {
    let runtime = FakeRuntime::with_state(|s| {
        s.volumes = vec![
            VolumeReference::new("t1"),
            VolumeReference::new("t1").with_session("s1"),
            VolumeReference::new("t2").with_session("s1"),
        ];
    });
    let manager = lifecycle(runtime.clone(), 4);

    manager
        .remove_volumes(vec![
            VolumeReference::new("t1").with_session("s1"),
            VolumeReference::new("t2").with_session("s1"),
        ])
        .await
        .expect("remove");

    assert_eq!(runtime.volume_names(), vec!["cyan-t1".to_string()]);
}
