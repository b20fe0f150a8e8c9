//! Daemon-facing surface for Oasis.
//!
//! Everything that talks to the local Docker daemon lives here: building
//! images out of a packed workspace, creating and starting the preview
//! container for a commit, and reading addresses and lifecycle state back
//! out of container inspections.

pub mod address;
pub mod client;
pub mod container;
pub mod image;

pub use address::{PORT_ENV_VAR, resolve_host, resolve_port};
pub use client::connect;
pub use container::{ContainerHandle, container_status};
