//! User-facing notices
//!
//! Failures that the surface must show as a blocking notice are broadcast
//! here; the store itself never changes on failure.

use serde::{Deserialize, Serialize};

/// Notices published by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A user-initiated command was rejected or never reached the engine
    CommandFailed {
        /// Engine command name, e.g. `setEnabled`
        command: String,
        message: String,
    },

    /// A background resync could not pull the snapshot
    SyncFailed {
        /// What asked for the resync (`mount`, `push`, `foreground`)
        trigger: String,
        message: String,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::CommandFailed { command, message } => {
                write!(f, "COMMAND_FAILED {} ({})", command, message)
            }
            Notice::SyncFailed { trigger, message } => {
                write!(f, "SYNC_FAILED on {} ({})", trigger, message)
            }
        }
    }
}
