//! Runtime configuration, read once from the environment.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_APP_NAME: &str = "oasis";
pub const DEFAULT_GIT_BASE_URL: &str = "https://github.com";

/// Process-level settings shared by the registry and its workers.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Prefix of every derived container name, image tag and workspace
    /// directory.
    pub app_name: String,
    /// Directory holding the per-commit checkout workspaces.
    pub workspaces_root: PathBuf,
    /// Base URL repositories are cloned from.
    pub git_base_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let app_name =
            env::var("OASIS_APP_NAME").unwrap_or_else(|_| DEFAULT_APP_NAME.to_string());

        let workspaces_root = env::var("OASIS_WORKSPACES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_workspaces_root());

        let git_base_url =
            env::var("OASIS_GIT_BASE_URL").unwrap_or_else(|_| DEFAULT_GIT_BASE_URL.to_string());

        Self {
            app_name,
            workspaces_root,
            git_base_url,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            workspaces_root: default_workspaces_root(),
            git_base_url: DEFAULT_GIT_BASE_URL.to_string(),
        }
    }
}

fn default_workspaces_root() -> PathBuf {
    env::temp_dir().join("oasis-workspaces")
}
