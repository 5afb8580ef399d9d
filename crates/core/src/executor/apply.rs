//! Applying single filesystem steps.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use super::error::ActionError;

/// Result of a step that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    /// File the step produced or left in place (destination of a move,
    /// downloaded trailer, generated asset).
    pub produced: Option<PathBuf>,
    /// The step found its work already done and changed nothing.
    pub already_done: bool,
}

impl AppliedStep {
    pub fn done(produced: Option<PathBuf>) -> Self {
        Self {
            produced,
            already_done: false,
        }
    }

    pub fn already_done(produced: Option<PathBuf>) -> Self {
        Self {
            produced,
            already_done: true,
        }
    }
}

/// Performs renames, moves and deletions, tolerating work that is already
/// done so a plan can be re-run safely.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionApplier;

impl ActionApplier {
    pub fn new() -> Self {
        Self
    }

    /// Moves `src` to `dst`, creating parent folders. Renames and moves only
    /// differ in whether the folder changes, so both come through here.
    pub async fn relocate(&self, src: &Path, dst: &Path) -> Result<AppliedStep, ActionError> {
        let src_exists = path_exists(src).await;
        let dst_exists = path_exists(dst).await;

        match (src_exists, dst_exists) {
            (false, true) => {
                debug!("{} already in place", dst.display());
                return Ok(AppliedStep::already_done(Some(dst.to_path_buf())));
            }
            (true, true) => {
                return Err(ActionError::DestinationExists {
                    path: dst.to_path_buf(),
                })
            }
            (false, false) => {
                return Err(ActionError::SourceMissing {
                    path: src.to_path_buf(),
                })
            }
            (true, false) => {}
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ActionError::io(parent, e))?;
        }

        if !Self::try_atomic_move(src, dst)
            .await
            .map_err(|e| ActionError::io(src, e))?
        {
            // Different filesystems: copy, then remove the original.
            fs::copy(src, dst)
                .await
                .map_err(|e| ActionError::io(dst, e))?;
            fs::remove_file(src)
                .await
                .map_err(|e| ActionError::io(src, e))?;
        }

        info!("Moved {} -> {}", src.display(), dst.display());
        Ok(AppliedStep::done(Some(dst.to_path_buf())))
    }

    /// Removes a file or a folder tree. An absent target counts as done.
    pub async fn delete(&self, path: &Path) -> Result<AppliedStep, ActionError> {
        let metadata = match fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AppliedStep::already_done(None));
            }
            Err(e) => return Err(ActionError::io(path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        result.map_err(|e| ActionError::io(path, e))?;

        info!("Deleted {}", path.display());
        Ok(AppliedStep::done(None))
    }

    /// Attempts an atomic rename. Returns false when source and destination
    /// are on different filesystems.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }
}

pub(crate) async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_relocate_creates_folder() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("The.Matrix.1999.mkv");
        let dst = dir.path().join("The Matrix (1999)/The Matrix (1999).mkv");
        std::fs::write(&src, b"movie").unwrap();

        let applied = ActionApplier::new().relocate(&src, &dst).await.unwrap();
        assert!(!applied.already_done);
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"movie");
    }

    #[tokio::test]
    async fn test_relocate_twice_is_already_done() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mkv");
        let dst = dir.path().join("b.mkv");
        std::fs::write(&src, b"movie").unwrap();

        let applier = ActionApplier::new();
        applier.relocate(&src, &dst).await.unwrap();
        let again = applier.relocate(&src, &dst).await.unwrap();
        assert!(again.already_done);
        assert_eq!(again.produced, Some(dst));
    }

    #[tokio::test]
    async fn test_relocate_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mkv");
        let dst = dir.path().join("b.mkv");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dst, b"old").unwrap();

        let result = ActionApplier::new().relocate(&src, &dst).await;
        assert!(matches!(result, Err(ActionError::DestinationExists { .. })));
        assert_eq!(std::fs::read(&dst).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_relocate_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = ActionApplier::new()
            .relocate(&dir.path().join("x"), &dir.path().join("y"))
            .await;
        assert!(matches!(result, Err(ActionError::SourceMissing { .. })));
    }

    #[tokio::test]
    async fn test_delete_tree_and_absent_target() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Dune (2021)");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("backdrop.jpg"), b"x").unwrap();

        let applier = ActionApplier::new();
        assert!(!applier.delete(&folder).await.unwrap().already_done);
        assert!(!folder.exists());
        assert!(applier.delete(&folder).await.unwrap().already_done);
    }
}
