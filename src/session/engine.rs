use std::path::Path;

use super::config::{RunOptions, SessionConfiguration};
use crate::error::SessionError;
use crate::recording::{FileRecordingTechnique, RecordingTechnique};

/// The underlying tracking session.
///
/// Implementations:
/// - [`SimulatedSession`](super::SimulatedSession): in-process engine fed by timers and replay files
/// - hardware engines (not part of this crate)
#[async_trait::async_trait]
pub trait TrackingSession: Send {
    /// Start, or restart, the session with a configuration.
    ///
    /// Fails when the configuration cannot be run (device missing, busy, ...).
    async fn run(
        &mut self,
        configuration: SessionConfiguration,
        options: RunOptions,
    ) -> Result<(), SessionError>;

    /// Stop consuming sensor data until the next `run`
    async fn pause(&mut self);

    /// Name for logging
    fn name(&self) -> &str;

    /// Derive a configuration that records into `output_path`.
    ///
    /// The technique is reported separately; an engine that cannot record
    /// returns `None` for it.
    fn recording_configuration(
        &self,
        template: SessionConfiguration,
        output_path: &Path,
    ) -> Result<(SessionConfiguration, Option<Box<dyn RecordingTechnique>>), SessionError> {
        let (technique, sink) = FileRecordingTechnique::create(output_path)?;
        Ok((template.with_recording(sink), Some(Box::new(technique))))
    }
}
