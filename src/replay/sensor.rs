use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

/// Notifications a replay sensor sends while it loads and plays a file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// First-generation "finished loading" notification
    FramesLoaded { count: usize },

    /// Second-generation "finished loading" notification with the replay's time span
    LoadingFinished { start: f64, end: f64 },

    /// Every frame has been delivered
    ReplayExhausted,

    /// The file could not be parsed
    LoadFailed { reason: String },
}

/// A replay event stamped with the replay it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub epoch: u64,
    pub event: ReplayEvent,
}

/// Sending half of the event channel handed to a replay sensor.
///
/// Safe to use from any thread; delivery order matches emission order.
#[derive(Debug, Clone)]
pub struct ReplayEventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ReplayEventSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn emit(&self, event: ReplayEvent) {
        let event = SessionEvent {
            epoch: self.epoch,
            event,
        };
        if let Err(e) = self.tx.send(event) {
            debug!("Replay event dropped, session owner is gone: {:?}", e.0.event);
        }
    }
}

/// Which generation of replay reader is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayBackend {
    Legacy,
    Modern,
}

impl fmt::Display for ReplayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Modern => f.write_str("modern"),
        }
    }
}

/// Playback tuning shared by both backends
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Playback speed as a multiple of recorded speed.
    /// Zero or negative values play at recorded speed.
    pub speed_multiplier: f64,
}

impl ReplayOptions {
    pub fn effective_speed(&self) -> f64 {
        if self.speed_multiplier > 0.0 {
            self.speed_multiplier
        } else {
            1.0
        }
    }
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

/// A source of recorded sensor data that stands in for live hardware.
///
/// Implementations:
/// - [`LegacyReplaySensor`](super::LegacyReplaySensor): bare frame files
/// - [`ModernReplaySensor`](super::ModernReplaySensor): header-carrying files, and bare ones
pub trait ReplaySensor: Send + fmt::Debug {
    fn backend(&self) -> ReplayBackend;

    /// File this sensor replays
    fn sequence_path(&self) -> &Path;

    /// Engine version the file was recorded with, when the format records it
    fn engine_version(&self) -> Option<&str> {
        None
    }

    fn os_version(&self) -> Option<&str> {
        None
    }

    fn device_model(&self) -> Option<&str> {
        None
    }

    /// Where load and playback notifications go
    fn set_delegate(&mut self, delegate: ReplayEventSink);

    /// Begin loading in the background. Notifications arrive through the delegate.
    fn load_async(&mut self);

    /// Abandon loading or playback. No further notifications are sent.
    fn stop(&mut self);

    /// Number of frames, once loading has finished
    fn frame_count(&self) -> Option<usize>;

    fn finished_replaying(&self) -> bool;
}
