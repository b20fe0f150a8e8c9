//! Error types for Oasis.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("clone failed: {0}")]
    CloneFailed(String),

    #[error("checkout failed: {0}")]
    CheckoutFailed(String),

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("container error: {0}")]
    ContainerFailed(String),

    #[error("daemon error: {0}")]
    Daemon(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
