//! The protocol build workers use to report back to the coordinator.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A message sent by a build worker to the coordinating registry.
///
/// `Host` and `Container` are last-write-wins facts about the build;
/// `Progress` and `Error` become append-only log entries. The serialized
/// shape is `{"type": "...", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Reachable address of the launched container.
    Host(String),
    /// Daemon id of the created (or reused) container.
    Container(String),
    /// Human-readable build progress.
    Progress(String),
    /// Human-readable failure report; terminal for the pipeline.
    Error(String),
}

/// One entry of a build's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// `true` for progress lines, `false` for errors.
    pub status: bool,
    pub message: String,
}

impl LogEntry {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

// Matches CSI escape sequences (colors, cursor movement) in builder output.
static ANSI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

/// Strip terminal escape sequences from a line of builder output.
pub fn strip_ansi(input: &str) -> String {
    ANSI_REGEX.replace_all(input, "").into_owned()
}
