//! Docker daemon connection.

use bollard::Docker;
use oasis_core::{Error, Result};
use tracing::debug;

/// Connect to the local Docker daemon.
///
/// Construction already fails when the socket file does not exist; whether
/// anything answers on it is `is_available`'s job. The handle is cheap to
/// clone; construct it once at startup and hand clones to everything that
/// needs the daemon.
pub fn connect() -> Result<Docker> {
    let docker = Docker::connect_with_local_defaults().map_err(|e| Error::Daemon(e.to_string()))?;
    debug!("Connected to Docker daemon");
    Ok(docker)
}

/// Check whether the daemon answers at all.
pub async fn is_available(docker: &Docker) -> bool {
    docker.ping().await.is_ok()
}


#[cfg(test)]
mod integration_tests {
    //! Needs the local Docker socket.
    //! Run with: cargo test -- --ignored

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_connect_reaches_the_local_daemon() {
        let docker = connect().unwrap();
        assert!(is_available(&docker).await);
    }
}
