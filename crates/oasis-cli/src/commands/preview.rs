//! `oasis preview`: build a commit and follow it to a running container.

use std::time::Duration;

use anyhow::Result;
use oasis_build::BuildRegistry;
use oasis_core::{CommitRef, Settings};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn run(settings: Settings, owner: String, repo: String, commit: String) -> Result<()> {
    let docker = oasis_docker::connect()?;
    if !oasis_docker::client::is_available(&docker).await {
        warn!("Docker daemon is not answering; the build will fail at the image stage");
    }
    let registry = BuildRegistry::new(docker.clone(), settings.clone());

    let commit = CommitRef::new(owner, repo, commit);
    println!("Previewing {commit}");
    let build = registry.ensure_build(&commit);

    // Follow the build log as the worker reports it. Reading the finished
    // flag before snapshotting the log means the last pass sees everything.
    let mut printed = 0;
    loop {
        let finished = build.is_finished();
        let logs = build.logs();
        for entry in &logs[printed..] {
            if entry.status {
                println!("{}", entry.message);
            } else {
                eprintln!("error: {}", entry.message);
            }
        }
        printed = logs.len();

        if finished {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    if build.logs().last().is_some_and(|entry| !entry.status) {
        anyhow::bail!("build of {commit} failed");
    }

    if let Some(container) = build.container() {
        println!("Container {}", container.id());
    }
    match build.host() {
        Some(host) => println!("Preview ready at {host}"),
        None => println!("Preview is up but exposes no resolvable address"),
    }
    if let Some(state) = oasis_docker::container_status(&docker, &commit, &settings.app_name).await
    {
        println!("Container state: {state}");
    }

    Ok(())
}
