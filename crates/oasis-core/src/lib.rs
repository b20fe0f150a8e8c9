//! Core domain types for Oasis preview environments.
//!
//! This crate contains:
//! - Commit references and the naming identities derived from them
//! - The progress protocol workers report over
//! - Build identifiers
//! - Runtime settings and error types

pub mod commit;
pub mod error;
pub mod id;
pub mod progress;
pub mod settings;

pub use commit::{CommitRef, ShortCommitId};
pub use error::{Error, Result};
pub use id::BuildId;
pub use progress::{LogEntry, WorkerMessage};
pub use settings::Settings;
