//! Overlaying processor output directories into one tree.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Copies every source tree into `to_dir`, in order.
///
/// Directories are created, files are copied with their permission bits.
/// A file present in several sources ends up with the content of the last
/// one. Symlinks are followed and copied as regular files.
///
/// # Errors
///
/// Stops at the first unreadable source or unwritable destination.
pub fn merge_files<P: AsRef<Path>>(from_dirs: &[P], to_dir: &Path) -> Result<()> {
    fs::create_dir_all(to_dir)?;

    for from in from_dirs {
        let from = from.as_ref();
        debug!(from = %from.display(), to = %to_dir.display(), "Overlaying directory");

        for entry in WalkDir::new(from) {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let dest = to_dir.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &dest)?;
            }
        }
    }

    Ok(())
}
