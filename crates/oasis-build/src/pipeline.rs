//! The per-commit build pipeline.
//!
//! One worker drives a commit from bare repository reference to inspected
//! container, reporting over its message channel as it goes. The worker
//! never surfaces an error to the registry directly; failures become a
//! terminal `Error` message on the channel like any other report.

use bollard::Docker;
use oasis_core::{CommitRef, Result, Settings, WorkerMessage};
use oasis_docker::{container, image, resolve_host};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::workspace;

/// Channel end a worker reports through.
pub type ProgressSender = mpsc::UnboundedSender<WorkerMessage>;

/// Stages a build moves through, in order. `Failed` can follow any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Idle,
    Acquiring,
    CheckedOut,
    ConfigLoaded,
    ImageBuilt,
    ContainerReady,
    Started,
    Inspected,
    Failed,
}

impl BuildStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStage::Inspected | BuildStage::Failed)
    }
}

/// Run the whole pipeline for `commit`, reporting through `progress`.
///
/// Returns the terminal stage. Every failure path sends the error text as
/// the build's final message before returning `Failed`.
pub async fn run(
    docker: &Docker,
    settings: &Settings,
    commit: &CommitRef,
    progress: &ProgressSender,
) -> BuildStage {
    match run_inner(docker, settings, commit, progress).await {
        Ok(stage) => stage,
        Err(err) => {
            error!(commit = %commit, error = %err, "Build failed");
            send(progress, WorkerMessage::Error(err.to_string()));
            BuildStage::Failed
        }
    }
}

async fn run_inner(
    docker: &Docker,
    settings: &Settings,
    commit: &CommitRef,
    progress: &ProgressSender,
) -> Result<BuildStage> {
    let app = settings.app_name.as_str();

    report(progress, "Preparing workspace");
    let (path, reused) = workspace::acquire(settings, commit).await?;
    debug!(commit = %commit, stage = ?BuildStage::Acquiring, path = %path.display(), reused, "Workspace ready");

    // An existing directory is trusted as a prior clone; the checkout below
    // still runs against whatever is in it.
    if !reused {
        report(progress, "Cloning repository");
        workspace::clone_into(settings, commit, &path).await?;
    }
    workspace::checkout(commit, &path).await?;
    info!(commit = %commit, stage = ?BuildStage::CheckedOut, "Commit checked out");

    let env = workspace::read_env_config(&path);
    debug!(commit = %commit, stage = ?BuildStage::ConfigLoaded, vars = env.len(), "Environment loaded");

    report(progress, "Building image");
    let files = workspace::collect_files(&path).await?;
    let context = image::build_context(&path, files).await?;
    let tag = commit.image_tag(app);
    image::build(docker, &tag, context, |line| report(progress, line)).await?;
    info!(commit = %commit, stage = ?BuildStage::ImageBuilt, tag = %tag, "Image built");

    // Cleanup is tied to the image build finishing, not to the pipeline
    // outcome; a failed build leaves the directory for the next attempt.
    workspace::cleanup(&path).await;

    report(progress, "Starting container");
    let handle = container::create_with_reuse(docker, commit, app, env).await?;
    send(progress, WorkerMessage::Container(handle.id().to_string()));
    info!(commit = %commit, stage = ?BuildStage::ContainerReady, container = %handle.id(), "Container ready");

    container::start_best_effort(docker, &handle).await;
    debug!(commit = %commit, stage = ?BuildStage::Started, "Start attempted");

    let inspection = container::inspect(docker, &handle).await?;
    if let Some(address) = resolve_host(&inspection) {
        send(progress, WorkerMessage::Host(address));
    }
    info!(commit = %commit, stage = ?BuildStage::Inspected, "Build complete");

    Ok(BuildStage::Inspected)
}

fn report(progress: &ProgressSender, message: impl Into<String>) {
    send(progress, WorkerMessage::Progress(message.into()));
}

// The receiver only goes away when the whole build is dropped; losing a
// message then does not matter.
fn send(progress: &ProgressSender, message: WorkerMessage) {
    let _ = progress.send(message);
}
