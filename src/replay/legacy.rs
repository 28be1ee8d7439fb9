use std::path::{Path, PathBuf};
use tracing::info;

use super::playback::{LoadNotice, Playback, PlaybackRequest};
use super::sensor::{ReplayBackend, ReplayEventSink, ReplayOptions, ReplaySensor};
use crate::error::ReplayError;

/// First-generation replay reader.
///
/// Understands only bare frame files; a second-generation header is a parse
/// failure. Reports loading through both notification generations.
#[derive(Debug)]
pub struct LegacyReplaySensor {
    path: PathBuf,
    options: ReplayOptions,
    delegate: Option<ReplayEventSink>,
    playback: Playback,
}

impl LegacyReplaySensor {
    pub fn open(path: impl Into<PathBuf>, options: ReplayOptions) -> Result<Self, ReplayError> {
        let path = path.into();
        std::fs::metadata(&path).map_err(|source| ReplayError::Open {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            options,
            delegate: None,
            playback: Playback::default(),
        })
    }
}

impl ReplaySensor for LegacyReplaySensor {
    fn backend(&self) -> ReplayBackend {
        ReplayBackend::Legacy
    }

    fn sequence_path(&self) -> &Path {
        &self.path
    }

    fn set_delegate(&mut self, delegate: ReplayEventSink) {
        self.delegate = Some(delegate);
    }

    fn load_async(&mut self) {
        info!("Loading legacy replay: {}", self.path.display());
        self.playback.start(PlaybackRequest {
            path: self.path.clone(),
            accept_header: false,
            notice: LoadNotice::FrameCountAndTimeRange,
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
