//! Transient working copies.
//!
//! [`WorkspaceManager::materialize`] creates a uniquely named directory and
//! clones into it under a timeout. The returned [`Workspace`] owns the
//! directory and removes it exactly once, either via [`Workspace::teardown`]
//! or when dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reportcard_state::RepositoryIdentity;
use tracing::warn;
use uuid::Uuid;

use crate::domain::error::WorkspaceError;
use crate::fingerprint::RemoteRepository;
use crate::obs;

/// Default bound on a clone.
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(15);

/// Creates workspaces under a root directory.
pub struct WorkspaceManager {
    root: PathBuf,
    clone_timeout: Duration,
    remote: Arc<dyn RemoteRepository>,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, remote: Arc<dyn RemoteRepository>) -> Self {
        Self {
            root: root.into(),
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
            remote,
        }
    }

    pub fn with_clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Clone `identity` into a fresh directory.
    ///
    /// On timeout or clone failure the directory is removed before the
    /// error is returned.
    pub async fn materialize(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Workspace, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self
            .root
            .join(format!("{}-{}", identity.name(), Uuid::new_v4().simple()));
        tokio::fs::create_dir(&path).await?;
        let workspace = Workspace::new(path);

        let start = Instant::now();
        let cloned = tokio::time::timeout(
            self.clone_timeout,
            self.remote.clone_repository(identity, workspace.path()),
        )
        .await;

        match cloned {
            Ok(Ok(())) => {
                obs::emit_workspace_materialized(
                    &identity.reference(),
                    workspace.path(),
                    start.elapsed().as_millis() as u64,
                );
                Ok(workspace)
            }
            Ok(Err(err)) => {
                workspace.teardown();
                Err(err)
            }
            Err(_) => {
                workspace.teardown();
                Err(WorkspaceError::CloneTimeout {
                    reference: identity.reference(),
                    timeout: self.clone_timeout,
                })
            }
        }
    }
}

/// A directory owned by one run.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace. Failures are logged, never raised.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = remove_tree(&self.path) {
            obs::emit_workspace_teardown_failed(&self.path, &err);
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            warn!(path = %self.path.display(), "workspace dropped without teardown");
        }
        self.release();
    }
}

/// Remove `path`: symlinks are unlinked without following them, directories
/// are removed recursively, and a missing path is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if meta.file_type().is_symlink() || !meta.is_dir() {
        std::fs::remove_file(path)
    } else {
        std::fs::remove_dir_all(path)
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
