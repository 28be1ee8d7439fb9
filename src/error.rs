//! Error types shared by the storage, replay and session layers.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::{Action, ModeKind};

/// Errors raised while managing replay artifacts on disk.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage directory could not be listed.
    #[error("failed to list replays in {path}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replay artifact could not be removed.
    #[error("failed to delete replay {path}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Storage directory creation failed.
    #[error("failed to create storage directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A new recording destination could not be created.
    #[error("failed to create replay file {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flushing a finished recording failed.
    #[error("failed to finalize replay file {path}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replay name contains path components or the wrong extension.
    #[error("invalid replay name: {0}")]
    InvalidName(String),

    /// Replay not found.
    #[error("replay not found: {0}")]
    NotFound(PathBuf),

    /// The replay is being recorded or played.
    #[error("replay is in use: {0}")]
    InUse(PathBuf),
}

impl StorageError {
    /// Returns `true` if the user can retry or pick another replay.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidName(_) | Self::InUse(_) | Self::Delete { .. }
        )
    }
}

/// Errors raised while opening or parsing a replay file.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to open replay {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed replay header in {path}")]
    Header {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed frame at {path}:{line}")]
    Frame {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the session state machine and its controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying tracking session refused the configuration.
    #[error("session failed to start: {reason}")]
    StartFailed { reason: String },

    /// Configuration construction did not produce a required component.
    #[error("configuration is missing its {0}")]
    MissingCapability(&'static str),

    /// The requested action is not offered in the current mode.
    #[error("{action} is not available while {mode}")]
    ActionUnavailable { action: Action, mode: ModeKind },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The controller task is gone.
    #[error("session controller is not running")]
    ControllerClosed,
}

impl SessionError {
    pub fn start_failed(reason: impl Into<String>) -> Self {
        Self::StartFailed {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
