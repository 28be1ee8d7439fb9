use std::error::Error as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use super::format::{read_frames, SensorFrame};
use super::sensor::{ReplayEvent, ReplayEventSink, ReplayOptions};

/// Which "finished loading" notifications a backend sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadNotice {
    TimeRange,
    /// Older readers report through both notification generations
    FrameCountAndTimeRange,
}

pub(crate) struct PlaybackRequest {
    pub path: PathBuf,
    pub accept_header: bool,
    pub notice: LoadNotice,
    pub options: ReplayOptions,
    pub delegate: Option<ReplayEventSink>,
}

/// Background task that loads a replay and paces its frames
#[derive(Debug, Default)]
pub(crate) struct Playback {
    task: Option<JoinHandle<()>>,
    frame_count: Arc<OnceLock<usize>>,
    finished: Arc<AtomicBool>,
}

impl Playback {
    pub fn start(&mut self, request: PlaybackRequest) {
        if self.task.is_some() {
            warn!("Replay of {} already started", request.path.display());
            return;
        }

        let frame_count = Arc::clone(&self.frame_count);
        let finished = Arc::clone(&self.finished);

        self.task = Some(tokio::spawn(async move {
            let PlaybackRequest {
                path,
                accept_header,
                notice,
                options,
                delegate,
            } = request;
            let emit = |event: ReplayEvent| match &delegate {
                Some(sink) => sink.emit(event),
                None => trace!("No replay delegate for {:?}", event),
            };

            let frames = match read_frames(&path, accept_header).await {
                Ok(frames) => frames,
                Err(e) => {
                    let reason = match e.source() {
                        Some(source) => format!("{}: {}", e, source),
                        None => e.to_string(),
                    };
                    warn!("Replay failed to load: {}", reason);
                    emit(ReplayEvent::LoadFailed { reason });
                    return;
                }
            };

            let delays = match pacing(&frames, options.effective_speed()) {
                Ok(delays) => delays,
                Err(reason) => {
                    let reason = format!("{}: {}", path.display(), reason);
                    warn!("Replay failed to load: {}", reason);
                    emit(ReplayEvent::LoadFailed { reason });
                    return;
                }
            };

            let start = frames.first().map(|f| f.timestamp).unwrap_or(0.0);
            let end = frames.last().map(|f| f.timestamp).unwrap_or(start);
            let _ = frame_count.set(frames.len());

            info!(
                "Replay sensor loaded {} frames from {:.3}s to {:.3}s",
                frames.len(),
                start,
                end
            );

            if notice == LoadNotice::FrameCountAndTimeRange {
                emit(ReplayEvent::FramesLoaded {
                    count: frames.len(),
                });
            }
            emit(ReplayEvent::LoadingFinished { start, end });

            for (frame, delay) in frames.iter().zip(delays) {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                trace!(sequence = frame.sequence, "Replayed frame");
            }

            finished.store(true, Ordering::SeqCst);
            info!("Replay finished: {}", path.display());
            emit(ReplayEvent::ReplayExhausted);
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn frame_count(&self) -> Option<usize> {
        self.frame_count.get().copied()
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Wait before each frame at the given speed.
///
/// Timestamps that go backwards replay immediately. Fails on non-finite
/// timestamps or gaps too large to wait for.
fn pacing(frames: &[SensorFrame], speed: f64) -> Result<Vec<Duration>, String> {
    let mut previous = frames.first().map(|f| f.timestamp).unwrap_or(0.0);
    let mut delays = Vec::with_capacity(frames.len());

    for frame in frames {
        if !frame.timestamp.is_finite() {
            return Err(format!("frame {} has no valid timestamp", frame.sequence));
        }
        let gap = ((frame.timestamp - previous) / speed).max(0.0);
        let delay = Duration::try_from_secs_f64(gap).map_err(|_| {
            format!(
                "frame {} is {:.3}s after the previous one, too long to replay",
                frame.sequence,
                frame.timestamp - previous
            )
        })?;
        delays.push(delay);
        previous = frame.timestamp;
    }

    Ok(delays)
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}
