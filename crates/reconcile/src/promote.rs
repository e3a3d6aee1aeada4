//! Commit point: the working tree becomes the canonical tree in one rename.

use std::path::Path;

use kni_core::{Error, Result};
use tracing::info;

fn promote_err(from: &Path, to: &Path, source: std::io::Error) -> Error {
    Error::Promote { from: from.to_path_buf(), to: to.to_path_buf(), source }
}

/// Replace `final_dir` with `working`. On failure the working tree is left
/// where it was.
pub fn promote(working: &Path, final_dir: &Path) -> Result<()> {
    if !working.is_dir() {
        return Err(promote_err(working, final_dir, std::io::Error::new(std::io::ErrorKind::NotFound, "working tree missing")));
    }
    let cleared = match std::fs::symlink_metadata(final_dir) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(final_dir),
        Ok(_) => std::fs::remove_file(final_dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    cleared.map_err(|e| promote_err(working, final_dir, e))?;
    if let Some(parent) = final_dir.parent() {
        std::fs::create_dir_all(parent).map_err(|e| promote_err(working, final_dir, e))?;
    }
    std::fs::rename(working, final_dir).map_err(|e| promote_err(working, final_dir, e))?;
    info!(from = %working.display(), to = %final_dir.display(), "manifest tree promoted");
    Ok(())
}
