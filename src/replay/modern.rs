use std::path::{Path, PathBuf};
use tracing::info;

use super::format::{probe_header, ReplayHeader};
use super::playback::{LoadNotice, Playback, PlaybackRequest};
use super::sensor::{ReplayBackend, ReplayEventSink, ReplayOptions, ReplaySensor};
use crate::error::ReplayError;

/// Second-generation replay reader.
///
/// Opening reads only the header line. Files without one are still
/// readable, but report no engine version, which marks them as
/// first-generation recordings.
#[derive(Debug)]
pub struct ModernReplaySensor {
    path: PathBuf,
    header: Option<ReplayHeader>,
    options: ReplayOptions,
    delegate: Option<ReplayEventSink>,
    playback: Playback,
}

impl ModernReplaySensor {
    pub fn open(path: impl Into<PathBuf>, options: ReplayOptions) -> Result<Self, ReplayError> {
        let path = path.into();
        let header = probe_header(&path)?;

        Ok(Self {
            path,
            header,
            options,
            delegate: None,
            playback: Playback::default(),
        })
    }

    pub fn header(&self) -> Option<&ReplayHeader> {
        self.header.as_ref()
    }
}

impl ReplaySensor for ModernReplaySensor {
    fn backend(&self) -> ReplayBackend {
        ReplayBackend::Modern
    }

    fn sequence_path(&self) -> &Path {
        &self.path
    }

    fn engine_version(&self) -> Option<&str> {
        self.header.as_ref().map(|h| h.engine_version.as_str())
    }

    fn os_version(&self) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.os_version.as_deref())
    }

    fn device_model(&self) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.device_model.as_deref())
    }

    fn set_delegate(&mut self, delegate: ReplayEventSink) {
        self.delegate = Some(delegate);
    }

    fn load_async(&mut self) {
        info!(
            "Loading replay: {} (engine {})",
            self.path.display(),
            self.engine_version().unwrap_or("unknown")
        );
        self.playback.start(PlaybackRequest {
            path: self.path.clone(),
            accept_header: true,
            notice: LoadNotice::TimeRange,
            options: self.options.clone(),
            delegate: self.delegate.clone(),
        });
    }

    fn stop(&mut self) {
        self.playback.stop();
    }

    fn frame_count(&self) -> Option<usize> {
        self.playback.frame_count()
    }

    fn finished_replaying(&self) -> bool {
        self.playback.finished()
    }
}
