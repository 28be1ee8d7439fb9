use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recording::RecordingTechnique;

/// What the session is currently doing. Exactly one mode is active.
#[derive(Debug)]
pub enum Mode {
    /// No session running
    Idle,
    /// Live sensing
    Normal,
    /// Live sensing into a replay file owned by the technique
    Recording(Box<dyn RecordingTechnique>),
    /// A replay file is being prepared
    LoadingReplay,
    /// Replay data is being fed into the session
    Replaying,
    /// Replay data exhausted, session paused
    ReplayFinished,
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Normal => ModeKind::Normal,
            Self::Recording(_) => ModeKind::Recording,
            Self::LoadingReplay => ModeKind::LoadingReplay,
            Self::Replaying => ModeKind::Replaying,
            Self::ReplayFinished => ModeKind::ReplayFinished,
        }
    }

    pub fn technique(&self) -> Option<&dyn RecordingTechnique> {
        match self {
            Self::Recording(technique) => Some(technique.as_ref()),
            _ => None,
        }
    }
}

/// Payload-free tag of a [`Mode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Idle,
    Normal,
    Recording,
    LoadingReplay,
    Replaying,
    ReplayFinished,
}

/// User-facing operations offered in a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartRecording,
    StopRecording,
    StartReplay,
    StopReplay,
}

impl ModeKind {
    /// Heading shown while in this mode
    pub fn title(self) -> Option<&'static str> {
        match self {
            Self::Idle => Some("Session Idle"),
            Self::Normal => None,
            Self::Recording => Some("RECORDING"),
            Self::LoadingReplay => Some("Loading…"),
            Self::Replaying => Some("REPLAYING"),
            Self::ReplayFinished => Some("Replay Finished"),
        }
    }

    pub fn leading_actions(self) -> &'static [Action] {
        match self {
            Self::Idle | Self::LoadingReplay => &[],
            Self::Normal => &[Action::StartRecording],
            Self::Recording => &[Action::StopRecording],
            Self::Replaying | Self::ReplayFinished => &[Action::StopReplay],
        }
    }

    pub fn trailing_actions(self) -> &'static [Action] {
        match self {
            Self::Normal => &[Action::StartReplay],
            _ => &[],
        }
    }

    pub fn available_actions(self) -> Vec<Action> {
        self.leading_actions()
            .iter()
            .chain(self.trailing_actions())
            .copied()
            .collect()
    }

    pub fn allows(self, action: Action) -> bool {
        self.leading_actions().contains(&action) || self.trailing_actions().contains(&action)
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Normal => "normal",
            Self::Recording => "recording",
            Self::LoadingReplay => "loading replay",
            Self::Replaying => "replaying",
            Self::ReplayFinished => "replay finished",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartRecording => "start recording",
            Self::StopRecording => "stop recording",
            Self::StartReplay => "start replay",
            Self::StopReplay => "stop replay",
        };
        f.write_str(name)
    }
}
