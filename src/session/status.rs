use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::mode::{Action, ModeKind};
use crate::replay::ReplayBackend;

/// Externally visible snapshot of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub mode: ModeKind,

    /// Heading for the current mode, if it has one
    pub title: Option<String>,

    /// Actions shown before the title
    pub leading_actions: Vec<Action>,

    /// Actions shown after the title
    pub trailing_actions: Vec<Action>,

    /// Destination of the recording in progress
    pub recording_path: Option<PathBuf>,

    /// Replay being loaded or played
    pub replay_path: Option<PathBuf>,

    pub replay_backend: Option<ReplayBackend>,

    /// Most recent failure, cleared by the next successful action
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Status derived purely from the mode
    pub fn for_mode(mode: ModeKind) -> Self {
        Self {
            mode,
            title: mode.title().map(str::to_string),
            leading_actions: mode.leading_actions().to_vec(),
            trailing_actions: mode.trailing_actions().to_vec(),
            recording_path: None,
            replay_path: None,
            replay_backend: None,
            last_error: None,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.mode.allows(action)
    }
}
