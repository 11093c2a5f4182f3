//! In-process fake of [`RemoteRepository`] for tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reportcard_state::{RepositoryIdentity, RevisionMarker};

use crate::domain::error::{FingerprintError, WorkspaceError};
use crate::fingerprint::RemoteRepository;

/// What [`FakeRemote::clone_repository`] does.
#[derive(Debug, Clone)]
pub enum CloneBehaviour {
    /// Write these `(relative path, contents)` pairs into the destination.
    Files(Vec<(PathBuf, String)>),
    /// Write a partial file, then sleep for the duration.
    Hang(Duration),
    /// Return `CloneFailed`.
    Fail,
}

/// Fake remote with a settable head revision and scripted clone behaviour.
pub struct FakeRemote {
    revision: Mutex<Option<String>>,
    clone: CloneBehaviour,
    revision_calls: AtomicUsize,
    clone_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new(revision: &str) -> Self {
        Self {
            revision: Mutex::new(Some(revision.to_string())),
            clone: CloneBehaviour::Files(Vec::new()),
            revision_calls: AtomicUsize::new(0),
            clone_calls: AtomicUsize::new(0),
        }
    }

    /// A remote whose head cannot be read.
    pub fn unreachable() -> Self {
        let remote = Self::new("");
        *remote.revision.lock().unwrap() = None;
        remote
    }

    pub fn with_clone(mut self, behaviour: CloneBehaviour) -> Self {
        self.clone = behaviour;
        self
    }

    /// Simulate a push to the default branch.
    pub fn set_revision(&self, revision: &str) {
        *self.revision.lock().unwrap() = Some(revision.to_string());
    }

    pub fn revision_calls(&self) -> usize {
        self.revision_calls.load(Ordering::SeqCst)
    }

    pub fn clone_calls(&self) -> usize {
        self.clone_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteRepository for FakeRemote {
    async fn fetch_revision(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<RevisionMarker, FingerprintError> {
        self.revision_calls.fetch_add(1, Ordering::SeqCst);
        let revision = self.revision.lock().unwrap().clone();
        revision
            .map(RevisionMarker::new)
            .ok_or_else(|| FingerprintError::Unreachable {
                reference: identity.reference(),
                reason: "fake remote is unreachable".to_string(),
            })
    }

    async fn clone_repository(
        &self,
        identity: &RepositoryIdentity,
        dest: &Path,
    ) -> Result<(), WorkspaceError> {
        self.clone_calls.fetch_add(1, Ordering::SeqCst);
        match &self.clone {
            CloneBehaviour::Files(files) => {
                for (rel, contents) in files {
                    let path = dest.join(rel);
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&path, contents).await?;
                }
                Ok(())
            }
            CloneBehaviour::Hang(duration) => {
                tokio::fs::write(dest.join(".partial"), b"incomplete").await?;
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            CloneBehaviour::Fail => Err(WorkspaceError::CloneFailed {
                reference: identity.reference(),
                reason: "fatal: repository not found".to_string(),
            }),
        }
    }
}
