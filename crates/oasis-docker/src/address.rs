//! Address resolution from container inspection metadata.
//!
//! A preview is reachable at the container's IP on the `bridge` network,
//! on whichever port the project declares. Projects opt in to an explicit
//! port through the `OASIS_PORT` environment variable; without it we fall
//! back to the container's published port map.

use bollard::models::ContainerInspectResponse;

/// Environment variable a previewed project sets to declare its port.
pub const PORT_ENV_VAR: &str = "OASIS_PORT";

const BRIDGE_NETWORK: &str = "bridge";

/// Determine which port a preview container listens on.
///
/// A parseable `OASIS_PORT` among the container's environment wins over the
/// port map. Returns `None` when neither source yields a port.
pub fn resolve_port(inspection: &ContainerInspectResponse) -> Option<u16> {
    declared_port(inspection).or_else(|| published_port(inspection))
}

/// Reachable `http://<ip>:<port>` address for a preview container.
///
/// `None` when the container is not attached to the bridge network, has no
/// IP assigned yet, or no port can be resolved.
pub fn resolve_host(inspection: &ContainerInspectResponse) -> Option<String> {
    let settings = inspection.network_settings.as_ref()?;
    let ip = settings
        .networks
        .as_ref()?
        .get(BRIDGE_NETWORK)?
        .ip_address
        .as_deref()
        .filter(|ip| !ip.is_empty())?;
    let port = resolve_port(inspection)?;
    Some(format!("http://{ip}:{port}"))
}

fn declared_port(inspection: &ContainerInspectResponse) -> Option<u16> {
    inspection
        .config
        .as_ref()?
        .env
        .as_ref()?
        .iter()
        .find_map(|entry| entry.strip_prefix(PORT_ENV_VAR)?.strip_prefix('='))
        .and_then(|value| value.trim().parse().ok())
}

// Port map keys look like "3000/tcp"; the part before the slash is the
// container-side port.
fn published_port(inspection: &ContainerInspectResponse) -> Option<u16> {
    inspection
        .network_settings
        .as_ref()?
        .ports
        .as_ref()?
        .keys()
        .find_map(|key| key.split('/').next()?.trim().parse().ok())
}
