//! Build coordination: at most one worker per commit.
//!
//! The registry hands out `CommitBuild`s keyed by short commit id. The
//! first request for a commit spawns its worker plus a task folding the
//! worker's messages into queryable state; every later request gets the
//! same build back, whatever stage it is in.

use std::collections::HashMap;
use std::sync::Arc;

use bollard::Docker;
use chrono::{DateTime, Utc};
use oasis_core::{BuildId, CommitRef, LogEntry, Settings, ShortCommitId, WorkerMessage};
use oasis_docker::ContainerHandle;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline;

#[derive(Debug, Default)]
struct BuildState {
    logs: Vec<LogEntry>,
    container: Option<ContainerHandle>,
    host: Option<String>,
}

/// One commit's build: the worker driving it plus everything the worker
/// has reported so far.
pub struct CommitBuild {
    id: BuildId,
    commit: CommitRef,
    created_at: DateTime<Utc>,
    state: Arc<Mutex<BuildState>>,
    worker: JoinHandle<()>,
    fold: JoinHandle<()>,
}

impl CommitBuild {
    fn spawn(docker: Docker, settings: Settings, commit: CommitRef) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(BuildState::default()));

        let fold = tokio::spawn(fold_messages(docker.clone(), Arc::clone(&state), rx));
        let worker = tokio::spawn({
            let commit = commit.clone();
            async move {
                pipeline::run(&docker, &settings, &commit, &tx).await;
            }
        });

        Self {
            id: BuildId::new(),
            commit,
            created_at: Utc::now(),
            state,
            worker,
            fold,
        }
    }

    pub fn id(&self) -> BuildId {
        self.id
    }

    pub fn commit(&self) -> &CommitRef {
        &self.commit
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Everything logged so far, in arrival order.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.clone()
    }

    /// Handle to the preview container, once the worker has reported one.
    pub fn container(&self) -> Option<ContainerHandle> {
        self.state.lock().container.clone()
    }

    /// Reachable address of the preview, once resolved.
    pub fn host(&self) -> Option<String> {
        self.state.lock().host.clone()
    }

    /// True once the worker is done and every message has been folded in.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished() && self.fold.is_finished()
    }
}

/// Registry of builds keyed by short commit id.
///
/// `ensure_build` is the only way to start one; lookup and insert happen
/// under a single lock, which is what makes a second request for an
/// in-flight commit join it instead of racing it.
pub struct BuildRegistry {
    docker: Docker,
    settings: Settings,
    builds: Mutex<HashMap<ShortCommitId, Arc<CommitBuild>>>,
}

impl BuildRegistry {
    pub fn new(docker: Docker, settings: Settings) -> Self {
        Self {
            docker,
            settings,
            builds: Mutex::new(HashMap::new()),
        }
    }

    /// The build for `commit`, started now if this is its first request.
    pub fn ensure_build(&self, commit: &CommitRef) -> Arc<CommitBuild> {
        let mut builds = self.builds.lock();
        if let Some(existing) = builds.get(&commit.commit) {
            return Arc::clone(existing);
        }

        info!(commit = %commit, "Starting build");
        let build = Arc::new(CommitBuild::spawn(
            self.docker.clone(),
            self.settings.clone(),
            commit.clone(),
        ));
        builds.insert(commit.commit.clone(), Arc::clone(&build));
        build
    }

    /// Look up an existing build without starting one.
    pub fn get(&self, commit: &ShortCommitId) -> Option<Arc<CommitBuild>> {
        self.builds.lock().get(commit).cloned()
    }

    /// Number of builds this registry has started.
    pub fn len(&self) -> usize {
        self.builds.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.lock().is_empty()
    }
}

async fn fold_messages(
    docker: Docker,
    state: Arc<Mutex<BuildState>>,
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            WorkerMessage::Progress(text) => state.lock().logs.push(LogEntry::progress(text)),
            WorkerMessage::Error(text) => state.lock().logs.push(LogEntry::error(text)),
            WorkerMessage::Host(address) => state.lock().host = Some(address),
            WorkerMessage::Container(id) => record_container(&docker, &state, &id).await,
        }
    }
}

/// Resolve the reported id against the daemon and store the confirmed
/// handle. An id that does not resolve leaves the build without one.
async fn record_container(docker: &Docker, state: &Mutex<BuildState>, id: &str) {
    match ContainerHandle::resolve(docker, id).await {
        Ok(handle) => state.lock().container = Some(handle),
        Err(err) => {
            warn!(container = %id, error = %err, "Reported container did not resolve");
        }
    }
}
