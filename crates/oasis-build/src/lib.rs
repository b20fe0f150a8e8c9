//! Build orchestration for Oasis previews.
//!
//! `BuildRegistry` owns every build this process has seen, keyed by short
//! commit id. Each build runs one worker task through the checkout, image
//! build, container create and inspect pipeline; the worker reports over
//! the progress protocol from `oasis-core` and the registry folds those
//! reports into state callers can poll.

pub mod git;
pub mod pipeline;
pub mod registry;
pub mod workspace;

pub use pipeline::BuildStage;
pub use registry::{BuildRegistry, CommitBuild};
