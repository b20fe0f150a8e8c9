//! Per-commit checkout workspaces.
//!
//! Each build clones into its own directory under the configured root,
//! named with the same scheme as the container. The workspace exists only
//! long enough to read the project's environment file and pack the build
//! context; it is removed once the image is built.

use std::path::{Path, PathBuf};

use async_recursion::async_recursion;
use oasis_core::{CommitRef, Result, Settings};
use tracing::{debug, warn};

use crate::git;

/// Optional per-project environment file, read from the checkout root.
pub const ENV_FILE: &str = ".oasis.env";

/// Workspace directory for one commit.
pub fn path_for(settings: &Settings, commit: &CommitRef) -> PathBuf {
    settings
        .workspaces_root
        .join(commit.container_name(&settings.app_name))
}

/// Locate the workspace for `commit`, creating the root on demand.
///
/// The second value reports whether a checkout directory is already
/// present. An existing directory is reused as-is: it only needs the
/// commit checked out again, never a second clone.
pub async fn acquire(settings: &Settings, commit: &CommitRef) -> Result<(PathBuf, bool)> {
    tokio::fs::create_dir_all(&settings.workspaces_root).await?;

    let path = path_for(settings, commit);
    let reused = tokio::fs::try_exists(&path).await?;
    if reused {
        debug!(path = %path.display(), "Reusing existing checkout");
    }

    Ok((path, reused))
}

/// Clone the commit's repository into `path`. The clone creates the
/// workspace directory itself.
pub async fn clone_into(settings: &Settings, commit: &CommitRef, path: &Path) -> Result<()> {
    git::clone(&commit.clone_url(&settings.git_base_url), path).await
}

/// Pin the checkout at `path` to the commit.
pub async fn checkout(commit: &CommitRef, path: &Path) -> Result<()> {
    git::checkout(path, commit.commit.as_str()).await
}

/// Environment declared by the project's `.oasis.env`, as `KEY=VALUE`
/// pairs ready for container creation.
///
/// Most projects have no such file; that (and any unreadable file) yields
/// an empty environment rather than an error.
pub fn read_env_config(path: &Path) -> Vec<String> {
    let file = path.join(ENV_FILE);
    match dotenvy::from_path_iter(&file) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|(key, value)| format!("{key}={value}"))
            .collect(),
        Err(err) => {
            debug!(path = %file.display(), error = %err, "No environment file");
            Vec::new()
        }
    }
}

/// Collect every file under `root` as root-relative paths, sorted.
///
/// Hidden files are part of the build context (projects keep meaningful
/// dotfiles), but the `.git` directory never is. Symlinked entries count
/// as files; packing the context follows them to their targets.
pub async fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, root, &mut files).await?;
    files.sort();
    Ok(files)
}

#[async_recursion]
async fn walk(root: &Path, current: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = tokio::fs::read_dir(current).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;

        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            walk(root, &path, files).await?;
        } else if file_type.is_file() || file_type.is_symlink() {
            files.push(path.strip_prefix(root).unwrap_or(&path).to_path_buf());
        }
    }

    Ok(())
}

/// Remove a finished workspace. Failures are logged, never fatal.
pub async fn cleanup(path: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(path).await {
        warn!(path = %path.display(), error = %err, "Workspace cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_root(root: &Path) -> Settings {
        Settings {
            app_name: "oasis".to_string(),
            workspaces_root: root.to_path_buf(),
            git_base_url: "https://github.com".to_string(),
        }
    }

    #[test]
    fn test_workspace_path_uses_container_naming() {
        let settings = settings_with_root(Path::new("/srv/previews"));
        let commit = CommitRef::new("alice", "widget", "abc1234567890");
        assert_eq!(
            path_for(&settings, &commit),
            PathBuf::from("/srv/previews/oasis_alice_widget_abc1234")
        );
    }

    #[tokio::test]
    async fn test_acquire_reuses_an_existing_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_root(dir.path());
        let commit = CommitRef::new("alice", "widget", "abc1234567890");

        let existing = path_for(&settings, &commit);
        tokio::fs::create_dir_all(&existing).await.unwrap();
        tokio::fs::write(existing.join("kept.txt"), "kept").await.unwrap();

        let (path, reused) = acquire(&settings, &commit).await.unwrap();
        assert_eq!(path, existing);
        assert!(reused);
        assert!(tokio::fs::try_exists(&path.join("kept.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_acquire_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_root(&dir.path().join("deeper/root"));
        let commit = CommitRef::new("alice", "widget", "abc1234567890");

        let (path, reused) = acquire(&settings, &commit).await.unwrap();
        assert!(settings.workspaces_root.is_dir());
        assert!(!reused);
        assert!(!tokio::fs::try_exists(&path).await.unwrap());
    }

    #[test]
    fn test_env_config_read_as_pairs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ENV_FILE),
            "OASIS_PORT=4000\nNODE_ENV=preview\n",
        )
        .unwrap();

        let env = read_env_config(dir.path());
        assert_eq!(env, vec!["OASIS_PORT=4000", "NODE_ENV=preview"]);
    }

    #[test]
    fn test_missing_env_file_yields_empty_environment() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_config(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_collect_files_keeps_dotfiles_but_not_git_internals() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join(ENV_FILE), "OASIS_PORT=4000\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.js"), "").unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/config"), "").unwrap();
        std::fs::write(dir.path().join(".git/objects/aa"), "").unwrap();

        let files = collect_files(dir.path()).await.unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from(".oasis.env"),
                PathBuf::from("Dockerfile"),
                PathBuf::from("src/index.js"),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_files_keeps_symlinked_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), "shared").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let files = collect_files(dir.path()).await.unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("link.txt"), PathBuf::from("real.txt")]
        );
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        cleanup(&dir.path().join("never-existed")).await;
    }
}
