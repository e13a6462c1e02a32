//! Temporary build workspaces and their deferred cleanup.
//!
//! Every job owns exactly one workspace directory for its whole lifetime.
//! Deletion is deferred behind a grace period: a zip-streaming response may
//! still be reading files out of the workspace after the build call
//! returns, so removing it synchronously would race that read. Deletion is
//! best-effort; failures are logged and left for process exit or an
//! external reaper.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WorkspaceConfig;

/// A scheduled deferred deletion.
///
/// Dropping the handle does NOT cancel the deletion; call `cancel` to keep
/// the files (e.g. when a later phase takes ownership of them).
#[derive(Debug)]
pub struct CleanupHandle {
    path: PathBuf,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// The path this handle will delete.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancel the pending deletion.
    pub fn cancel(self) {
        self.task.abort();
        debug!("Cancelled scheduled cleanup for {}", self.path.display());
    }

    /// Returns true once the deletion task has run (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Owns the lifetime of build workspaces under a configured root.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
    cleanup_grace: Duration,
    archive_grace: Duration,
}

impl WorkspaceStore {
    /// Create a store from configuration.
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            root: config.root.clone(),
            cleanup_grace: Duration::from_secs(config.cleanup_grace_secs),
            archive_grace: Duration::from_secs(config.archive_grace_secs),
        }
    }

    /// Root directory under which workspaces are created.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory where assembled archives are written.
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    /// Allocate a fresh, uniquely-named workspace directory.
    pub async fn create_workspace(&self) -> io::Result<PathBuf> {
        let path = self
            .root
            .join(format!("packsmith-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        debug!("Created workspace {}", path.display());
        Ok(path)
    }

    /// Schedule recursive deletion of a workspace directory after the
    /// configured grace period. Best-effort and non-blocking; runs exactly
    /// once per call.
    pub fn schedule_cleanup(&self, path: PathBuf) -> CleanupHandle {
        info!(
            "Scheduled cleanup of workspace {} in {:?}",
            path.display(),
            self.cleanup_grace
        );
        Self::schedule(path, self.cleanup_grace, true)
    }

    /// Schedule deletion of a single file (an assembled archive) after the
    /// archive grace period.
    pub fn schedule_file_cleanup(&self, path: PathBuf) -> CleanupHandle {
        info!(
            "Scheduled cleanup of file {} in {:?}",
            path.display(),
            self.archive_grace
        );
        Self::schedule(path, self.archive_grace, false)
    }

    fn schedule(path: PathBuf, grace: Duration, recursive: bool) -> CleanupHandle {
        let task_path = path.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let result = if recursive {
                tokio::fs::remove_dir_all(&task_path).await
            } else {
                tokio::fs::remove_file(&task_path).await
            };

            match result {
                Ok(()) => info!("Cleaned up {}", task_path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Cleanup target {} already gone", task_path.display());
                }
                Err(e) => {
                    // Not raised: the workspace is no longer load-bearing,
                    // and process exit is the backstop.
                    warn!(
                        "Unable to clean up {}: {}. It will be removed on process exit.",
                        task_path.display(),
                        e
                    );
                }
            }
        });

        CleanupHandle { path, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_grace(root: &Path, grace_ms: u64) -> WorkspaceStore {
        WorkspaceStore::new(&WorkspaceConfig {
            root: root.to_path_buf(),
            cleanup_grace_secs: 0,
            archive_grace_secs: 0,
        })
        .with_grace_for_test(Duration::from_millis(grace_ms))
    }

    impl WorkspaceStore {
        fn with_grace_for_test(mut self, grace: Duration) -> Self {
            self.cleanup_grace = grace;
            self.archive_grace = grace;
            self
        }
    }

    #[tokio::test]
    async fn test_create_workspace_unique_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with_grace(temp.path(), 50);

        let a = store.create_workspace().await.unwrap();
        let b = store.create_workspace().await.unwrap();

        assert_ne!(a, b);
        assert!(a.is_dir());
        assert!(b.is_dir());
        assert!(a.starts_with(temp.path()));
    }

    #[tokio::test]
    async fn test_cleanup_removes_dir_after_grace() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with_grace(temp.path(), 20);

        let ws = store.create_workspace().await.unwrap();
        tokio::fs::write(ws.join("app.apk"), b"apk bytes").await.unwrap();

        let handle = store.schedule_cleanup(ws.clone());
        assert!(ws.is_dir());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_finished());
        assert!(!ws.exists());
    }

    #[tokio::test]
    async fn test_cancel_keeps_dir() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with_grace(temp.path(), 20);

        let ws = store.create_workspace().await.unwrap();
        let handle = store.schedule_cleanup(ws.clone());
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(ws.is_dir());
    }

    #[tokio::test]
    async fn test_file_cleanup() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with_grace(temp.path(), 20);

        let file = temp.path().join("bundle.zip");
        tokio::fs::write(&file, b"zip bytes").await.unwrap();

        store.schedule_file_cleanup(file.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_path_does_not_panic() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_with_grace(temp.path(), 10);

        let handle = store.schedule_cleanup(temp.path().join("never-created"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
