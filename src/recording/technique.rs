use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::replay::{ReplayHeader, SensorFrame};

/// Captures a session into a replay file.
///
/// Finishing consumes the technique, so a recording can only be finalized
/// once.
pub trait RecordingTechnique: Send + fmt::Debug {
    /// Destination the technique was configured with
    fn output_path(&self) -> &Path;

    /// Flush and close the recording, returning the finished artifact
    fn finish_recording(self: Box<Self>) -> Result<PathBuf, StorageError>;
}

type SharedWriter = Arc<Mutex<Option<BufWriter<File>>>>;

fn lock(writer: &SharedWriter) -> MutexGuard<'_, Option<BufWriter<File>>> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Technique that writes second-generation replay files
#[derive(Debug)]
pub struct FileRecordingTechnique {
    output_path: PathBuf,
    writer: SharedWriter,
    frames: Arc<AtomicU64>,
}

/// Session-side handle of a [`FileRecordingTechnique`].
///
/// The session writes frames here; writes after the technique is finished
/// are discarded.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    output_path: PathBuf,
    writer: SharedWriter,
    frames: Arc<AtomicU64>,
}

impl FileRecordingTechnique {
    /// Create the destination file and write its header.
    ///
    /// Fails if the destination already exists; replays are never rewritten.
    pub fn create(output_path: impl Into<PathBuf>) -> Result<(Self, RecordingSink), StorageError> {
        let output_path = output_path.into();
        let create_error = |source| StorageError::Create {
            path: output_path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&output_path)
            .map_err(create_error)?;

        let mut writer = BufWriter::new(file);
        let header = ReplayHeader::current().encode().map_err(io::Error::from);
        header
            .and_then(|line| writeln!(writer, "{}", line))
            .map_err(create_error)?;

        info!("Recording to {}", output_path.display());

        let writer = Arc::new(Mutex::new(Some(writer)));
        let frames = Arc::new(AtomicU64::new(0));
        let sink = RecordingSink {
            output_path: output_path.clone(),
            writer: Arc::clone(&writer),
            frames: Arc::clone(&frames),
        };

        Ok((
            Self {
                output_path,
                writer,
                frames,
            },
            sink,
        ))
    }

    pub fn frames_written(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl RecordingTechnique for FileRecordingTechnique {
    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn finish_recording(self: Box<Self>) -> Result<PathBuf, StorageError> {
        let writer = lock(&self.writer).take();

        if let Some(mut writer) = writer {
            writer
                .flush()
                .and_then(|_| writer.get_ref().sync_all())
                .map_err(|source| StorageError::Finalize {
                    path: self.output_path.clone(),
                    source,
                })?;
        }

        info!(
            "Recording finished: {} ({} frames)",
            self.output_path.display(),
            self.frames_written()
        );

        Ok(self.output_path.clone())
    }
}

impl RecordingSink {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Append a frame. Returns `Ok(false)` once the recording has been finished.
    pub fn write_frame(&self, frame: &SensorFrame) -> io::Result<bool> {
        let mut guard = lock(&self.writer);
        let Some(writer) = guard.as_mut() else {
            return Ok(false);
        };

        let line = frame.encode().map_err(io::Error::from)?;
        writeln!(writer, "{}", line)?;
        self.frames.fetch_add(1, Ordering::SeqCst);

        Ok(true)
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.writer).is_none()
    }
}

impl Drop for FileRecordingTechnique {
    fn drop(&mut self) {
        // Reached only when a technique is discarded without being finished
        if let Some(mut writer) = lock(&self.writer).take() {
            if let Err(e) = writer.flush() {
                warn!(
                    "Failed to flush abandoned recording {}: {}",
                    self.output_path.display(),
                    e
                );
            }
        }
    }
}
