//! Per-job workspace management.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::path::{Component, Path, PathBuf};
use talkforge_common::JobId;
use tempfile::TempDir;

/// Exclusive scratch directory for one render job.
///
/// Every file a job reads or writes lives here. The directory is created
/// empty under an absolute root with a unique name derived from the job id,
/// and is removed by [`Workspace::release`] or, at the latest, on drop.
///
/// # Example
///
/// ```no_run
/// use talkforge_av::Workspace;
/// use talkforge_common::JobId;
///
/// let workspace = Workspace::acquire(std::path::Path::new("/tmp"), &JobId::new())?;
/// let wav = workspace.file("input.wav");
/// assert!(workspace.contains(&wav));
/// workspace.release()?;
/// workspace.release()?; // idempotent
/// # Ok::<(), talkforge_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Mutex<Option<TempDir>>,
}

impl Workspace {
    /// Allocate a fresh workspace for `job_id` under `root`.
    ///
    /// The root is created if missing and canonicalized, so every path
    /// handed out by the workspace is absolute.
    pub fn acquire(root: &Path, job_id: &JobId) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|e| {
            Error::Workspace(format!(
                "failed to create workspace root {}: {e}",
                root.display()
            ))
        })?;
        let root = root.canonicalize().map_err(|e| {
            Error::Workspace(format!(
                "failed to resolve workspace root {}: {e}",
                root.display()
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("talkforge-{}-", job_id.simple()))
            .tempdir_in(&root)
            .map_err(|e| Error::Workspace(format!("failed to create workspace: {e}")))?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Acquired workspace {:?} for job {}", dir.path(), job_id);

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Mutex::new(Some(dir)),
        })
    }

    /// Get the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file with the given name inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Whether `path` is absolute and lies inside this workspace.
    ///
    /// Paths containing `..` are rejected outright instead of being resolved.
    pub fn contains(&self, path: &Path) -> bool {
        path.is_absolute()
            && !path.components().any(|c| matches!(c, Component::ParentDir))
            && path.starts_with(&self.path)
    }

    /// Remove the workspace and everything in it.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn release(&self) -> Result<()> {
        let dir = self.dir.lock().take();
        if let Some(dir) = dir {
            #[cfg(feature = "tracing")]
            tracing::debug!("Releasing workspace {:?}", self.path);
            dir.close().map_err(|e| {
                Error::Workspace(format!(
                    "failed to remove workspace {}: {e}",
                    self.path.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Whether [`Workspace::release`] has already run.
    pub fn is_released(&self) -> bool {
        self.dir.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_empty_absolute_dir() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), &JobId::new()).unwrap();

        assert!(ws.path().is_absolute());
        assert!(ws.path().is_dir());
        assert_eq!(std::fs::read_dir(ws.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_name_contains_job_id() {
        let root = tempfile::tempdir().unwrap();
        let id = JobId::new();
        let ws = Workspace::acquire(root.path(), &id).unwrap();
        let name = ws.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("talkforge-{}-", id.simple())));
    }

    #[test]
    fn test_workspaces_are_exclusive_even_for_same_job() {
        let root = tempfile::tempdir().unwrap();
        let id = JobId::new();
        let a = Workspace::acquire(root.path(), &id).unwrap();
        let b = Workspace::acquire(root.path(), &id).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_release_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), &JobId::new()).unwrap();
        std::fs::write(ws.file("input.wav"), b"data").unwrap();

        ws.release().unwrap();
        assert!(!ws.path().exists());
        assert!(ws.is_released());

        ws.release().unwrap();
        assert!(!ws.path().exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(root.path(), &JobId::new()).unwrap();
            std::fs::create_dir(ws.file("nested")).unwrap();
            std::fs::write(ws.file("nested/out.mp4"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_acquire_creates_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("deeper/root");
        let ws = Workspace::acquire(&root, &JobId::new()).unwrap();
        assert!(ws.path().starts_with(root.canonicalize().unwrap()));
    }

    #[test]
    fn test_contains() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), &JobId::new()).unwrap();

        assert!(ws.contains(&ws.file("input.png")));
        assert!(!ws.contains(Path::new("input.png")));
        assert!(!ws.contains(&ws.path().join("../other/input.png")));
        assert!(!ws.contains(&root.path().join("elsewhere.wav")));
    }
}
