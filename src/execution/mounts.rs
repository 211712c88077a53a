//! Volume mount conventions shared by every coordinator-launched container.

use crate::naming::VolumeReference;

/// Where the template volume is mounted. Read-only for workers.
pub const TEMPLATE_MOUNT_PATH: &str = "/workspace/cyanprint";

/// Where the session volume is mounted. Workers write their output here.
pub const SESSION_MOUNT_PATH: &str = "/workspace/area";

/// A named volume mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub volume: VolumeReference,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn read_only(volume: VolumeReference, target: impl Into<String>) -> Self {
        Self {
            volume,
            target: target.into(),
            read_only: true,
        }
    }

    pub fn read_write(volume: VolumeReference, target: impl Into<String>) -> Self {
        Self {
            volume,
            target: target.into(),
            read_only: false,
        }
    }
}

/// Mounts for processor, plugin and merger containers.
pub fn worker_mounts(read: &VolumeReference, write: &VolumeReference) -> Vec<VolumeMount> {
    vec![
        VolumeMount::read_only(read.clone(), TEMPLATE_MOUNT_PATH),
        VolumeMount::read_write(write.clone(), SESSION_MOUNT_PATH),
    ]
}

/// Mounts for the long-lived template container.
pub fn template_mounts(template: &VolumeReference) -> Vec<VolumeMount> {
    vec![VolumeMount::read_only(template.clone(), TEMPLATE_MOUNT_PATH)]
}

/// Mounts for the helper that unpacks a template blob into its volume.
pub fn unzip_mounts(target: &VolumeReference) -> Vec<VolumeMount> {
    vec![VolumeMount::read_write(target.clone(), TEMPLATE_MOUNT_PATH)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_mounts() {
        let read = VolumeReference::new("tpl");
        let write = VolumeReference::new("tpl").with_session("s1");
        let mounts = worker_mounts(&read, &write);

        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].volume, read);
        assert_eq!(mounts[0].target, "/workspace/cyanprint");
        assert!(mounts[0].read_only);
        assert_eq!(mounts[1].volume, write);
        assert_eq!(mounts[1].target, "/workspace/area");
        assert!(!mounts[1].read_only);
    }

    #[test]
    fn test_unzip_mounts_are_writable() {
        let mounts = unzip_mounts(&VolumeReference::new("tpl"));
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].target, TEMPLATE_MOUNT_PATH);
        assert!(!mounts[0].read_only);
    }

    #[test]
    fn test_template_mounts_are_read_only() {
        let mounts = template_mounts(&VolumeReference::new("tpl"));
        assert_eq!(mounts.len(), 1);
        assert!(mounts[0].read_only);
    }
}
