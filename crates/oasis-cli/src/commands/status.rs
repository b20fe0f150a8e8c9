//! `oasis status`: report the container state for a commit's preview.

use anyhow::Result;
use oasis_core::{CommitRef, Settings};

pub async fn run(settings: Settings, owner: String, repo: String, commit: String) -> Result<()> {
    let docker = oasis_docker::connect()?;
    let commit = CommitRef::new(owner, repo, commit);
    let name = commit.container_name(&settings.app_name);

    match oasis_docker::container_status(&docker, &commit, &settings.app_name).await {
        Some(state) => println!("{name}: {state}"),
        None => println!("{name}: not running"),
    }

    Ok(())
}
