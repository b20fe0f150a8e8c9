//! Commit references and the naming identities derived from them.
//!
//! Every name the daemon sees (container names, image tags, workspace
//! directories) is a pure function of app name, owner, repo and short
//! commit id. Re-deriving a name for the same inputs always yields the
//! same string, which is what makes container and image reuse work.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Number of characters of the full commit hash that participate in naming.
pub const SHORT_ID_LEN: usize = 7;

/// The short form of a commit hash: its first seven characters.
///
/// Truncation happens exactly once, at construction; every identity derived
/// afterwards sees only this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ShortCommitId(String);

impl ShortCommitId {
    /// Truncate a full (or already short) commit hash to its short form.
    pub fn new(commit_ish: impl AsRef<str>) -> Self {
        Self(commit_ish.as_ref().chars().take(SHORT_ID_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything needed to address one commit of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub owner: String,
    pub repo: String,
    pub commit: ShortCommitId,
}

impl CommitRef {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        commit_ish: impl AsRef<str>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            commit: ShortCommitId::new(commit_ish),
        }
    }

    /// Deterministic container name: `<app>_<owner>_<repo>_<short>`.
    pub fn container_name(&self, app: &str) -> String {
        format!("{}_{}_{}_{}", app, self.owner, self.repo, self.commit)
    }

    /// Deterministic image tag: `<app>_<owner>_<repo>:<short>`.
    pub fn image_tag(&self, app: &str) -> String {
        format!("{}_{}_{}:{}", app, self.owner, self.repo, self.commit)
    }

    /// HTTPS clone URL for the repository under the given git host.
    pub fn clone_url(&self, base: &str) -> String {
        format!("{}/{}/{}.git", base.trim_end_matches('/'), self.owner, self.repo)
    }
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.commit)
    }
}
