//! Repository fingerprints: canonical identity plus current revision.
//!
//! [`resolve`] is pure and turns a user-supplied reference into a
//! [`RepositoryIdentity`]. [`RemoteRepository`] covers the two network
//! operations the pipeline needs: reading the current head revision and
//! cloning a working copy.

use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reportcard_state::{RepositoryIdentity, RevisionMarker};

use crate::domain::error::{FingerprintError, WorkspaceError};

/// Remote operations on a repository.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Read the default-branch head without fetching repository contents.
    async fn fetch_revision(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<RevisionMarker, FingerprintError>;

    /// Clone a minimal-history working copy into `dest`, an existing empty
    /// directory. Timeouts are enforced by the caller.
    async fn clone_repository(
        &self,
        identity: &RepositoryIdentity,
        dest: &Path,
    ) -> Result<(), WorkspaceError>;
}

const HOST_PATTERN: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?(?::\d{1,5})?$";
const SEGMENT_PATTERN: &str = r"^[A-Za-z0-9_.-]+$";

fn host_matches(host: &str) -> bool {
    static HOST: OnceLock<Option<Regex>> = OnceLock::new();
    HOST
        .get_or_init(|| Regex::new(HOST_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(host))
}

fn segment_matches(segment: &str) -> bool {
    static SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();
    SEGMENT
        .get_or_init(|| Regex::new(SEGMENT_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(segment))
        && segment != "."
        && segment != ".."
}

/// Parse a repository reference into its canonical identity.
///
/// Accepted shapes:
/// - `host/owner/name`
/// - `scheme://[user[:password]@]host[:port]/owner/name`
/// - `user@host:owner/name` (scp-like)
///
/// A single trailing `/` and a `.git` suffix are ignored. Exactly three
/// segments must remain after the scheme and credentials are stripped.
pub fn resolve(raw: &str) -> Result<RepositoryIdentity, FingerprintError> {
    let invalid = |reason: &str| FingerprintError::InvalidReference {
        reference: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty reference"));
    }

    let (rest, has_scheme) = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let scheme_ok = !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !scheme_ok {
                return Err(invalid("malformed scheme"));
            }
            (rest, true)
        }
        None => (trimmed, false),
    };

    // Credentials end at the last '@' before the first path separator.
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let rest = match rest[..authority_end].rfind('@') {
        Some(at) => &rest[at + 1..],
        None => rest,
    };

    // Without a scheme, `host:owner/name` is scp syntax rather than a port.
    let rest = if has_scheme {
        rest.to_string()
    } else {
        match rest.find(':') {
            Some(colon) if colon < rest.find('/').unwrap_or(rest.len()) => {
                format!("{}/{}", &rest[..colon], &rest[colon + 1..])
            }
            _ => rest.to_string(),
        }
    };

    let path = rest.strip_suffix('/').unwrap_or(&rest);
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != 3 {
        return Err(invalid("expected exactly host/owner/name"));
    }

    let (host, owner, name) = (segments[0], segments[1], segments[2]);
    let name = name.strip_suffix(".git").unwrap_or(name);

    if !host_matches(host) {
        return Err(invalid("malformed host"));
    }
    for segment in [owner, name] {
        if !segment_matches(segment) {
            return Err(invalid("malformed owner or repository name"));
        }
    }

    Ok(RepositoryIdentity::new(host, owner, name))
}
