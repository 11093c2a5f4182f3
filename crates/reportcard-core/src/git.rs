//! `git` command-line implementation of [`RemoteRepository`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reportcard_state::{RepositoryIdentity, RevisionMarker};
use tokio::process::Command;
use tracing::debug;

use crate::domain::error::{FingerprintError, WorkspaceError};
use crate::fingerprint::RemoteRepository;

/// Default bound on `git ls-remote`.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Talks to remotes through the `git` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct GitRemote {
    scheme: String,
    mirror_base: Option<String>,
    remote_timeout: Duration,
    clone_depth: u32,
}

impl Default for GitRemote {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            mirror_base: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            clone_depth: 1,
        }
    }
}

impl GitRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Replace `<scheme>://<host>` with `base` when building remote URLs.
    pub fn with_mirror_base(mut self, base: impl Into<String>) -> Self {
        self.mirror_base = Some(base.into());
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = depth.max(1);
        self
    }

    /// URL handed to `git` for this identity.
    pub fn remote_url(&self, identity: &RepositoryIdentity) -> String {
        let base = match &self.mirror_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("{}://{}", self.scheme, identity.host()),
        };
        format!("{base}/{}/{}.git", identity.owner(), identity.name())
    }

    fn git() -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RemoteRepository for GitRemote {
    #[tracing::instrument(skip(self), fields(reference = %identity))]
    async fn fetch_revision(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<RevisionMarker, FingerprintError> {
        let unreachable = |reason: String| FingerprintError::Unreachable {
            reference: identity.reference(),
            reason,
        };

        let url = self.remote_url(identity);
        let child = Self::git()
            .args(["ls-remote", &url, "HEAD"])
            .spawn()
            .map_err(|e| unreachable(format!("failed to run git: {e}")))?;

        let output = tokio::time::timeout(self.remote_timeout, child.wait_with_output())
            .await
            .map_err(|_| unreachable(format!("ls-remote timed out after {:?}", self.remote_timeout)))?
            .map_err(|e| unreachable(format!("ls-remote failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unreachable(format!(
                "ls-remote exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hash = parse_ls_remote_head(&stdout)
            .ok_or_else(|| unreachable("no HEAD revision advertised".to_string()))?;
        debug!(revision = %hash, "resolved remote head");
        Ok(RevisionMarker::new(hash))
    }

    #[tracing::instrument(skip(self, dest), fields(reference = %identity))]
    async fn clone_repository(
        &self,
        identity: &RepositoryIdentity,
        dest: &Path,
    ) -> Result<(), WorkspaceError> {
        let url = self.remote_url(identity);
        let depth = format!("--depth={}", self.clone_depth);
        let child = Self::git()
            .args(["clone", "--quiet", &depth, "--", &url])
            .arg(dest)
            .spawn()
            .map_err(|e| WorkspaceError::CloneFailed {
                reference: identity.reference(),
                reason: format!("failed to run git: {e}"),
            })?;

        let output = child.wait_with_output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            return Err(WorkspaceError::CloneFailed {
                reference: identity.reference(),
                reason: format!("git clone exited with {}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Extract the hash from the `HEAD` line of `git ls-remote` output.
pub fn parse_ls_remote_head(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let (hash, refname) = line.split_once('\t')?;
        (refname.trim() == "HEAD" && is_revision_hash(hash.trim()))
            .then(|| hash.trim().to_ascii_lowercase())
    })
}

/// SHA-1 (40) or SHA-256 (64) hex digest.
pub fn is_revision_hash(candidate: &str) -> bool {
    matches!(candidate.len(), 40 | 64) && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    const SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    fn widgets() -> RepositoryIdentity {
        RepositoryIdentity::new("github.com", "acme", "widgets")
    }

    #[test]
    fn parse_head_line() {
        let out = format!("{SHA}\tHEAD\n");
        assert_eq!(parse_ls_remote_head(&out).as_deref(), Some(SHA));
    }

    #[test]
    fn parse_ignores_other_refs() {
        let out = format!("{SHA}\trefs/heads/main\n");
        assert_eq!(parse_ls_remote_head(&out), None);
        assert_eq!(parse_ls_remote_head(""), None);
    }

    #[test]
    fn parse_rejects_malformed_hash() {
        assert_eq!(parse_ls_remote_head("abc123\tHEAD\n"), None);
        assert_eq!(parse_ls_remote_head(&format!("{}zz\tHEAD", &SHA[..38])), None);
    }

    #[test]
    fn accepts_sha256_hashes() {
        let sha256 = "a".repeat(64);
        assert!(is_revision_hash(&sha256));
        assert!(!is_revision_hash(&"a".repeat(50)));
    }

    #[test]
    fn remote_url_defaults_to_https() {
        assert_eq!(
            GitRemote::new().remote_url(&widgets()),
            "https://github.com/acme/widgets.git"
        );
        assert_eq!(
            GitRemote::new().with_scheme("git").remote_url(&widgets()),
            "git://github.com/acme/widgets.git"
        );
    }

    #[test]
    fn mirror_base_replaces_scheme_and_host() {
        let remote = GitRemote::new().with_mirror_base("file:///srv/mirror/");
        assert_eq!(
            remote.remote_url(&widgets()),
            "file:///srv/mirror/acme/widgets.git"
        );
    }

    // -- real git against a local bare repository --------------------------

    fn run_git(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Bare repository at `<tmp>/acme/widgets.git` with one commit.
    /// Returns the temp dir and the head sha.
    fn make_bare_remote() -> (tempfile::TempDir, String) {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        std::fs::create_dir(&work).unwrap();
        run_git(&work, &["init", "--quiet"]);
        run_git(&work, &["config", "user.name", "test-user"]);
        run_git(&work, &["config", "user.email", "test@example.com"]);
        std::fs::write(work.join("main.py"), "print('hi')\n").unwrap();
        run_git(&work, &["add", "."]);
        run_git(&work, &["commit", "--quiet", "-m", "initial"]);
        let head = run_git(&work, &["rev-parse", "HEAD"]);

        let owner_dir = tmp.path().join("acme");
        std::fs::create_dir(&owner_dir).unwrap();
        run_git(
            tmp.path(),
            &["clone", "--quiet", "--bare", "work", "acme/widgets.git"],
        );
        (tmp, head)
    }

    fn mirror_for(tmp: &tempfile::TempDir) -> GitRemote {
        GitRemote::new().with_mirror_base(format!("file://{}", tmp.path().display()))
    }

    #[tokio::test]
    async fn fetch_revision_reads_head() {
        let (tmp, head) = make_bare_remote();
        let rev = mirror_for(&tmp).fetch_revision(&widgets()).await.unwrap();
        assert_eq!(rev.as_str(), head);
    }

    #[tokio::test]
    async fn fetch_revision_missing_repo_is_unreachable() {
        let (tmp, _) = make_bare_remote();
        let missing = RepositoryIdentity::new("github.com", "acme", "gadgets");
        let err = mirror_for(&tmp).fetch_revision(&missing).await.unwrap_err();
        assert!(matches!(err, FingerprintError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn clone_repository_populates_destination() {
        let (tmp, _) = make_bare_remote();
        let dest = tmp.path().join("checkout");
        std::fs::create_dir(&dest).unwrap();
        mirror_for(&tmp).clone_repository(&widgets(), &dest).await.unwrap();
        assert!(dest.join("main.py").is_file());
    }

    #[tokio::test]
    async fn clone_repository_missing_repo_fails() {
        let (tmp, _) = make_bare_remote();
        let dest = tmp.path().join("checkout");
        std::fs::create_dir(&dest).unwrap();
        let missing = RepositoryIdentity::new("github.com", "acme", "gadgets");
        let err = mirror_for(&tmp).clone_repository(&missing, &dest).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::CloneFailed { .. }));
    }
}
