use serde::{Deserialize, Serialize};

use crate::recording::RecordingSink;
use crate::replay::ReplaySensor;

/// Surfaces the tracker looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneDetection {
    Horizontal,
    Vertical,
}

/// Tracking features every configuration starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingOptions {
    pub plane_detection: Vec<PlaneDetection>,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            plane_detection: vec![PlaneDetection::Horizontal, PlaneDetection::Vertical],
        }
    }
}

/// Extra component run alongside tracking. Recording and replay never mix.
#[derive(Debug, Default)]
pub enum Attachment {
    #[default]
    None,
    Recording(RecordingSink),
    Replay(Box<dyn ReplaySensor>),
}

/// Everything the underlying session needs to start
#[derive(Debug, Default)]
pub struct SessionConfiguration {
    pub tracking: TrackingOptions,
    pub attachment: Attachment,
}

impl SessionConfiguration {
    /// Live sensing with no recording or replay
    pub fn base(tracking: TrackingOptions) -> Self {
        Self {
            tracking,
            attachment: Attachment::None,
        }
    }

    pub fn with_recording(self, sink: RecordingSink) -> Self {
        Self {
            attachment: Attachment::Recording(sink),
            ..self
        }
    }

    pub fn with_replay(self, sensor: Box<dyn ReplaySensor>) -> Self {
        Self {
            attachment: Attachment::Replay(sensor),
            ..self
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self.attachment {
            Attachment::None => "base",
            Attachment::Recording(_) => "recording",
            Attachment::Replay(_) => "replay",
        }
    }
}

/// How a (re)started session treats existing tracking state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub reset_tracking: bool,
    pub remove_existing_anchors: bool,
}

impl RunOptions {
    /// Continue from the current tracking state
    pub const RESUME: Self = Self {
        reset_tracking: false,
        remove_existing_anchors: false,
    };

    /// Start over in a new spatial context
    pub const RESET: Self = Self {
        reset_tracking: true,
        remove_existing_anchors: true,
    };
}
