//! Container lifecycle for previews.
//!
//! Create is idempotent per commit: the deterministic container name means
//! a second build of the same commit collides, and the daemon's conflict
//! error names the container that already owns the name. We parse that id
//! out and adopt the existing container instead of failing.

use std::sync::LazyLock;

use bollard::Docker;
use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::models::ContainerInspectResponse;
use oasis_core::{CommitRef, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// Conflict text: `... is already in use by container "abc123". You have to
// remove (or rename) that container ...`. Older daemons leave the id
// unquoted.
static NAME_CONFLICT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"by container "?(\w+)"?\."#).unwrap());

/// Handle to a daemon-managed container.
///
/// The id inside is always one the daemon itself reported, either from the
/// create response or from an inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    id: String,
}

impl ContainerHandle {
    /// Resolve a handle from a container id or name via inspection.
    pub async fn resolve(docker: &Docker, id: &str) -> Result<Self> {
        let inspection = docker
            .inspect_container(id, None)
            .await
            .map_err(|e| Error::NotFound(format!("container {id}: {e}")))?;
        Ok(Self {
            id: inspection.id.unwrap_or_else(|| id.to_string()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Create the preview container for `commit`, adopting an existing one when
/// the name is already taken.
///
/// `env` is injected into the container as `KEY=VALUE` pairs. Creation
/// failures that are not the name-conflict shape are returned as-is.
pub async fn create_with_reuse(
    docker: &Docker,
    commit: &CommitRef,
    app: &str,
    env: Vec<String>,
) -> Result<ContainerHandle> {
    let name = commit.container_name(app);
    let options = CreateContainerOptions {
        name: name.clone(),
        platform: None,
    };
    let config = Config {
        image: Some(commit.image_tag(app)),
        env: Some(env),
        ..Default::default()
    };

    info!(container = %name, "Creating container");
    match docker.create_container(Some(options), config).await {
        Ok(created) => Ok(ContainerHandle { id: created.id }),
        Err(err) => match conflicting_container_id(&err.to_string()) {
            Some(existing) => {
                debug!(container = %name, id = %existing, "Name taken, adopting existing container");
                ContainerHandle::resolve(docker, &existing).await
            }
            None => Err(Error::ContainerFailed(format!(
                "failed to create {name}: {err}"
            ))),
        },
    }
}

/// Start a container, tolerating one that is already running.
///
/// Start problems are logged but never fail the pipeline; inspection
/// afterwards reports the actual state.
pub async fn start_best_effort(docker: &Docker, handle: &ContainerHandle) {
    match docker
        .start_container(handle.id(), None::<StartContainerOptions<String>>)
        .await
    {
        Ok(()) => info!(container = %handle.id(), "Container started"),
        Err(DockerError::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            debug!(container = %handle.id(), "Container already running");
        }
        Err(err) => {
            warn!(container = %handle.id(), error = %err, "Container start failed");
        }
    }
}

/// Full inspection metadata for a container.
pub async fn inspect(docker: &Docker, handle: &ContainerHandle) -> Result<ContainerInspectResponse> {
    docker
        .inspect_container(handle.id(), None)
        .await
        .map_err(|e| Error::Daemon(e.to_string()))
}

/// Lifecycle state of the named container for `commit`, as the daemon
/// reports it (`created`, `running`, `exited`, ...).
///
/// Collapses every failure to `None`; lookups never error.
pub async fn container_status(docker: &Docker, commit: &CommitRef, app: &str) -> Option<String> {
    let name = commit.container_name(app);
    let inspection = docker.inspect_container(&name, None).await.ok()?;
    inspection.state?.status.map(|status| status.to_string())
}

fn conflicting_container_id(message: &str) -> Option<String> {
    NAME_CONFLICT_REGEX
        .captures(message)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_id_extracted_from_daemon_text() {
        let message = "Conflict. The container name \"/oasis_acme_web_abc1234\" is already in use \
                       by container abc123. You have to remove (or rename) that container to be \
                       able to reuse that name.";
        assert_eq!(conflicting_container_id(message), Some("abc123".to_string()));
    }

    #[test]
    fn test_conflict_id_extracted_when_quoted() {
        let message = "Conflict. The container name \"/oasis_acme_web_abc1234\" is already in use \
                       by container \"9f86d081deadbeef\". You have to remove (or rename) that \
                       container to be able to reuse that name.";
        assert_eq!(
            conflicting_container_id(message),
            Some("9f86d081deadbeef".to_string())
        );
    }

    #[test]
    fn test_unrelated_errors_have_no_conflict_id() {
        assert_eq!(conflicting_container_id("No such image: oasis_acme_web:abc1234"), None);
        assert_eq!(conflicting_container_id(""), None);
    }

    #[tokio::test]
    async fn test_status_of_unknown_container_is_none() {
        // The socket file exists but nothing serves it; the failed inspect
        // collapses to None like any other lookup failure.
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        std::fs::write(&socket, "").unwrap();
        let docker =
            Docker::connect_with_socket(socket.to_str().unwrap(), 120, bollard::API_DEFAULT_VERSION)
                .unwrap();

        let commit = CommitRef::new("nobody", "nothing", "0000000000000000000000000000000000000000");
        assert_eq!(container_status(&docker, &commit, "oasis").await, None);
    }
}

#[cfg(test)]
mod integration_tests {
    //! Tests that require a running Docker daemon.
    //! Run with: cargo test -- --ignored

    use bollard::image::{CreateImageOptions, TagImageOptions};
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_create_is_idempotent_per_commit() {
        let docker = crate::client::connect().unwrap();
        let commit = CommitRef::new("oasis-it", "reuse", "feedfacefeedfacefeedfacefeedfacefeedface");
        let app = "oasis-it";

        // Pull a tiny base image and alias it under the preview naming
        // scheme so create has something to instantiate.
        let mut pull = docker.create_image(
            Some(CreateImageOptions {
                from_image: "alpine:latest",
                ..Default::default()
            }),
            None,
            None,
        );
        while let Some(event) = pull.next().await {
            event.unwrap();
        }
        let image = commit.image_tag(app);
        let (repo, tag) = image.split_once(':').unwrap();
        docker
            .tag_image("alpine:latest", Some(TagImageOptions { repo, tag }))
            .await
            .unwrap();

        let first = create_with_reuse(&docker, &commit, app, vec![]).await.unwrap();
        let second = create_with_reuse(&docker, &commit, app, vec![]).await.unwrap();
        assert_eq!(first.id(), second.id());

        docker
            .remove_container(
                &commit.container_name(app),
                None::<bollard::container::RemoveContainerOptions>,
            )
            .await
            .unwrap();
        docker.remove_image(&image, None, None).await.unwrap();
    }
}
