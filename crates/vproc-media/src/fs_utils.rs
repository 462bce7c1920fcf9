//! Filesystem helpers for publishing finished outputs.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// EXDEV on Linux and macOS.
const EXDEV: i32 = 18;

/// Move `src` to `dst`, creating the destination directory if needed.
///
/// A plain rename is tried first. When the scratch and output directories are
/// on different filesystems the file is copied next to `dst` under a
/// temporary name, renamed into place, and the source removed.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device move, copying"
            );
            copy_into_place(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

async fn copy_into_place(src: &Path, dst: &Path) -> MediaResult<()> {
    let staging = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staging).await {
        remove_quietly(&staging).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staging, dst).await {
        remove_quietly(&staging).await;
        return Err(e.into());
    }

    remove_quietly(src).await;
    Ok(())
}

/// Remove a file, logging instead of failing.
pub async fn remove_quietly(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove file: {}", e),
    }
}
