use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::{RunOptions, SessionConfiguration, TrackingOptions};
use super::engine::TrackingSession;
use super::mode::{Action, Mode, ModeKind};
use super::status::SessionStatus;
use crate::error::{Result, SessionError, StorageError};
use crate::recording::RecordingTechnique;
use crate::replay::{
    ReplayBackend, ReplayEvent, ReplayEventSink, ReplayFormatResolver, SessionEvent,
};
use crate::storage::ReplayStore;

#[derive(Debug, Clone)]
struct ActiveReplay {
    path: PathBuf,
    backend: ReplayBackend,
}

/// Owns the session mode and drives the underlying tracking session.
///
/// Every method must be called from the single task that owns the machine;
/// replay notifications reach it through [`handle_event`](Self::handle_event)
/// after being queued on the event channel.
pub struct SessionStateMachine<S> {
    session: S,
    store: ReplayStore,
    resolver: ReplayFormatResolver,
    tracking: TrackingOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
    mode: Mode,
    /// Incremented for every replay started; notifications carry it
    replay_epoch: u64,
    replay: Option<ActiveReplay>,
    last_error: Option<String>,
}

impl<S: TrackingSession> SessionStateMachine<S> {
    pub fn new(
        session: S,
        store: ReplayStore,
        resolver: ReplayFormatResolver,
        tracking: TrackingOptions,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            session,
            store,
            resolver,
            tracking,
            events,
            mode: Mode::Idle,
            replay_epoch: 0,
            replay: None,
            last_error: None,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn store(&self) -> &ReplayStore {
        &self.store
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            recording_path: self
                .mode
                .technique()
                .map(|technique| technique.output_path().to_path_buf()),
            replay_path: self.replay.as_ref().map(|replay| replay.path.clone()),
            replay_backend: self.replay.as_ref().map(|replay| replay.backend),
            last_error: self.last_error.clone(),
            ..SessionStatus::for_mode(self.kind())
        }
    }

    /// Switch modes, finalizing the recording if one is in progress.
    ///
    /// Does not touch the underlying session; callers run it as the new
    /// mode requires.
    pub fn transition(&mut self, mode: Mode) {
        let from = self.kind();
        let previous = std::mem::replace(&mut self.mode, Mode::Idle);

        if let Mode::Recording(technique) = previous {
            match technique.finish_recording() {
                Ok(path) => info!("Saved replay: {}", path.display()),
                Err(e) => {
                    error!("Failed to finish recording: {}", e);
                    self.last_error = Some(e.to_string());
                }
            }
        }

        self.mode = mode;
        info!("Session mode: {} -> {}", from, self.kind());
    }

    /// Start live sensing the first time the session is shown.
    pub async fn appear(&mut self) -> Result<ModeKind> {
        if self.kind() != ModeKind::Idle {
            debug!("Session already active ({})", self.kind());
            return Ok(self.kind());
        }

        let configuration = self.base_configuration();
        let started = self.session.run(configuration, RunOptions::RESUME).await;
        if let Err(e) = started {
            return Err(self.note_failure(e));
        }

        self.last_error = None;
        self.transition(Mode::Normal);
        Ok(self.kind())
    }

    /// Begin recording into a newly allocated replay file.
    pub async fn start_recording(&mut self) -> Result<PathBuf> {
        self.ensure_allowed(Action::StartRecording)?;

        let output_path = self.store.allocate_new_identifier();
        let (configuration, technique) = match self.recording_configuration(&output_path) {
            Ok(parts) => parts,
            Err(e) => return Err(self.note_failure(e)),
        };

        let started = self.session.run(configuration, RunOptions::RESET).await;
        if let Err(e) = started {
            self.discard_recording(technique);
            return Err(self.note_failure(e));
        }

        self.last_error = None;
        self.transition(Mode::Recording(technique));
        Ok(output_path)
    }

    /// Finish the recording and keep sensing without resetting tracking.
    pub async fn stop_recording(&mut self) -> Result<()> {
        self.ensure_allowed(Action::StopRecording)?;

        self.transition(Mode::Normal);

        let configuration = self.base_configuration();
        let resumed = self.session.run(configuration, RunOptions::RESUME).await;
        if let Err(e) = resumed {
            return Err(self.note_failure(e));
        }

        self.last_error = None;
        Ok(())
    }

    /// Replay the selected file. `None` means the picker was dismissed.
    pub async fn start_replay(
        &mut self,
        selection: Option<PathBuf>,
    ) -> Result<Option<ReplayBackend>> {
        self.ensure_allowed(Action::StartReplay)?;

        let Some(path) = selection else {
            debug!("Replay selection cancelled");
            return Ok(None);
        };

        let mut sensor = match self.resolver.resolve(&path) {
            Ok(sensor) => sensor,
            Err(e) => return Err(self.note_failure(e.into())),
        };

        self.replay_epoch += 1;
        sensor.set_delegate(ReplayEventSink::new(self.replay_epoch, self.events.clone()));
        let backend = sensor.backend();
        let configuration = self.base_configuration().with_replay(sensor);

        self.session.pause().await;
        let started = self.session.run(configuration, RunOptions::RESET).await;
        if let Err(e) = started {
            let e = self.note_failure(e);
            self.restore_normal().await;
            return Err(e);
        }

        self.last_error = None;
        self.replay = Some(ActiveReplay { path, backend });
        self.transition(Mode::LoadingReplay);
        Ok(Some(backend))
    }

    /// Abandon the replay and return to live sensing in a fresh context.
    pub async fn stop_replay(&mut self) -> Result<()> {
        self.ensure_allowed(Action::StopReplay)?;

        self.replay = None;
        self.transition(Mode::Normal);

        let configuration = self.base_configuration();
        let restarted = self.session.run(configuration, RunOptions::RESET).await;
        if let Err(e) = restarted {
            return Err(self.note_failure(e));
        }

        self.last_error = None;
        Ok(())
    }

    /// Apply a replay notification. Returns whether it changed the mode.
    ///
    /// Notifications from a superseded replay, or ones that do not fit the
    /// current mode, are dropped. Both "finished loading" notifications may
    /// arrive for one load; only the first moves the machine on.
    pub async fn handle_event(&mut self, event: SessionEvent) -> bool {
        if event.epoch != self.replay_epoch {
            debug!(
                "Dropping notification from replay #{} (current #{}): {:?}",
                event.epoch, self.replay_epoch, event.event
            );
            return false;
        }

        match (event.event, self.kind()) {
            (ReplayEvent::FramesLoaded { .. }, ModeKind::LoadingReplay)
            | (ReplayEvent::LoadingFinished { .. }, ModeKind::LoadingReplay) => {
                self.transition(Mode::Replaying);
                true
            }
            (ReplayEvent::ReplayExhausted, ModeKind::Replaying) => {
                self.transition(Mode::ReplayFinished);
                self.session.pause().await;
                true
            }
            (ReplayEvent::LoadFailed { reason }, ModeKind::LoadingReplay) => {
                warn!("Replay could not be loaded: {}", reason);
                self.replay = None;
                self.transition(Mode::Normal);
                self.restore_normal().await;
                self.last_error = Some(reason);
                true
            }
            (event, mode) => {
                debug!("Ignoring {:?} while {}", event, mode);
                false
            }
        }
    }

    /// Replays available to pick from
    pub fn list_replays(&self) -> Result<Vec<PathBuf>, StorageError> {
        self.store.enumerate()
    }

    /// Delete a replay, refusing the one currently recorded or replayed.
    pub fn delete_replay(&self, identifier: &Path) -> Result<(), StorageError> {
        let recording = self.mode.technique().map(|t| t.output_path());
        let replaying = self.replay.as_ref().map(|r| r.path.as_path());

        if recording == Some(identifier) || replaying == Some(identifier) {
            return Err(StorageError::InUse(identifier.to_path_buf()));
        }

        self.store.delete(identifier)
    }

    /// Leave any active mode and stop the session.
    pub async fn shutdown(&mut self) {
        if self.kind() == ModeKind::Idle {
            return;
        }

        self.replay = None;
        self.transition(Mode::Idle);
        self.session.pause().await;
    }

    fn base_configuration(&self) -> SessionConfiguration {
        SessionConfiguration::base(self.tracking.clone())
    }

    fn recording_configuration(
        &self,
        output_path: &Path,
    ) -> Result<(SessionConfiguration, Box<dyn RecordingTechnique>)> {
        let (configuration, technique) = self
            .session
            .recording_configuration(self.base_configuration(), output_path)?;

        match technique {
            Some(technique) => Ok((configuration, technique)),
            None => {
                error!(
                    "{} produced a recording configuration without a technique",
                    self.session.name()
                );
                debug_assert!(false, "recording configuration produced no technique");
                Err(SessionError::MissingCapability("recording technique"))
            }
        }
    }

    /// Close out a technique whose session never started and remove its file.
    fn discard_recording(&self, technique: Box<dyn RecordingTechnique>) {
        let output_path = technique.output_path().to_path_buf();

        if let Err(e) = technique.finish_recording() {
            warn!("Failed to close unused recording: {}", e);
        }
        if let Err(e) = self.store.delete(&output_path) {
            warn!("Failed to remove unused recording: {}", e);
        }
    }

    /// Best effort return to live sensing after a replay could not run.
    async fn restore_normal(&mut self) {
        let configuration = self.base_configuration();
        let restored = self.session.run(configuration, RunOptions::RESET).await;
        if let Err(e) = restored {
            error!("Failed to resume live session: {}", e);
        }
    }

    fn ensure_allowed(&self, action: Action) -> Result<()> {
        let mode = self.kind();
        if mode.allows(action) {
            Ok(())
        } else {
            Err(SessionError::ActionUnavailable { action, mode })
        }
    }

    fn note_failure(&mut self, e: SessionError) -> SessionError {
        warn!("Session action failed: {}", e);
        self.last_error = Some(e.to_string());
        e
    }
}
