//! Request-scoped scratch directories.
//!
//! A [`Workspace`] owns one uniquely-named directory under the system temp
//! root. It is removed by [`Workspace::close`], or on drop if `close` was
//! never reached.

use super::MediaError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Isolated scratch directory owned by exactly one download request
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh directory named `<prefix><random>` under the temp root.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory cannot be created.
    pub fn open(prefix: &str) -> Result<Self, MediaError> {
        Self::open_in(prefix, std::env::temp_dir())
    }

    /// Like [`Workspace::open`], but under an explicit parent directory.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory cannot be created.
    pub fn open_in(prefix: &str, parent: impl AsRef<Path>) -> Result<Self, MediaError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "Workspace opened");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Directory path. Still returned after close, but no longer exists then.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`Workspace::close`] has already run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove the directory and everything in it.
    ///
    /// Removal errors are logged and ignored. Calling it again is a no-op.
    pub fn close(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(path = %self.path.display(), "Workspace removed"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove workspace, ignoring"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.is_closed() {
            debug!(path = %self.path.display(), "Workspace dropped without close");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_prefixed_directory() -> Result<(), MediaError> {
        let root = tempfile::tempdir()?;
        let ws = Workspace::open_in("yt_dl_", root.path())?;

        assert!(ws.path().is_dir());
        let name = ws
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        assert!(name.starts_with("yt_dl_"));
        Ok(())
    }

    #[test]
    fn test_workspaces_are_unique() -> Result<(), MediaError> {
        let root = tempfile::tempdir()?;
        let a = Workspace::open_in("song_dl_", root.path())?;
        let b = Workspace::open_in("song_dl_", root.path())?;
        assert_ne!(a.path(), b.path());
        Ok(())
    }

    #[test]
    fn test_close_removes_contents_and_is_idempotent() -> Result<(), MediaError> {
        let root = tempfile::tempdir()?;
        let mut ws = Workspace::open_in("yt_dl_", root.path())?;
        let nested = ws.path().join("sub");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(nested.join("track.mp3"), b"data")?;

        ws.close();
        assert!(ws.is_closed());
        assert!(!ws.path().exists());

        // second close must not panic or error
        ws.close();
        assert!(ws.is_closed());
        Ok(())
    }

    #[test]
    fn test_drop_removes_directory() -> Result<(), MediaError> {
        let root = tempfile::tempdir()?;
        let path = {
            let ws = Workspace::open_in("yt_dl_", root.path())?;
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_close_tolerates_directory_removed_externally() -> Result<(), MediaError> {
        let root = tempfile::tempdir()?;
        let mut ws = Workspace::open_in("yt_dl_", root.path())?;
        std::fs::remove_dir_all(ws.path())?;
        ws.close();
        assert!(ws.is_closed());
        Ok(())
    }
}
