//! Git plumbing: clone a repository and pin it to a commit.

use std::path::Path;
use std::process::Stdio;

use oasis_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Clone `url` into `target`.
///
/// Full history on purpose: the commit being previewed can sit arbitrarily
/// far behind the branch head, so a shallow clone would miss it.
pub async fn clone(url: &str, target: &Path) -> Result<()> {
    info!(url = %url, path = %target.display(), "Cloning repository");

    let output = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(target)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CloneFailed(stderr.trim().to_string()));
    }

    Ok(())
}

/// Check out `commit_ish` inside an existing clone.
///
/// Short hashes work here the same way they do on the command line; git
/// resolves the prefix against the full history.
pub async fn checkout(repo: &Path, commit_ish: &str) -> Result<()> {
    debug!(path = %repo.display(), commit = %commit_ish, "Checking out commit");

    let output = Command::new("git")
        .args(["checkout", commit_ish])
        .current_dir(repo)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CheckoutFailed(stderr.trim().to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clone_of_bogus_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = clone("file:///dev/null/nope.git", &dir.path().join("checkout")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_checkout_outside_a_repo_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = checkout(dir.path(), "abc1234").await;
        assert!(result.is_err());
    }
}
