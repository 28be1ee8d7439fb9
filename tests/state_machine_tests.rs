// Integration tests for the session state machine
//
// These tests drive the machine against a scripted tracking session so that
// every run/pause it issues, and every recording it finalizes, can be
// checked. Replay notifications are fed in by hand to control ordering.

use anyhow::Result;
use replay_recorder::replay::{ReplayHeader, SensorFrame};
use replay_recorder::{
    Action, FileRecordingTechnique, ModeKind, RecordingTechnique, ReplayBackend, ReplayEvent,
    ReplayFormatResolver, ReplayOptions, ReplayStore, RunOptions, SessionConfiguration,
    SessionError, SessionEvent, SessionStateMachine, StorageError, TrackingOptions,
    TrackingSession,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Run {
        label: &'static str,
        options: RunOptions,
    },
    Pause,
}

#[derive(Debug, Clone)]
enum Technique {
    File,
    Counting(Arc<AtomicUsize>),
    Missing,
}

/// Technique that only counts how often it is finished
#[derive(Debug)]
struct CountingTechnique {
    output_path: PathBuf,
    finished: Arc<AtomicUsize>,
}

impl RecordingTechnique for CountingTechnique {
    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn finish_recording(self: Box<Self>) -> Result<PathBuf, StorageError> {
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.output_path.clone())
    }
}

/// Tracking session that records what it was asked to do
#[derive(Debug, Clone)]
struct ScriptedSession {
    calls: Arc<Mutex<Vec<Call>>>,
    fail: Arc<AtomicBool>,
    technique: Technique,
}

impl ScriptedSession {
    fn new(technique: Technique) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
            technique,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn fail_runs(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TrackingSession for ScriptedSession {
    async fn run(
        &mut self,
        configuration: SessionConfiguration,
        options: RunOptions,
    ) -> Result<(), SessionError> {
        self.calls.lock().unwrap().push(Call::Run {
            label: configuration.label(),
            options,
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::start_failed("scripted failure"));
        }
        Ok(())
    }

    async fn pause(&mut self) {
        self.calls.lock().unwrap().push(Call::Pause);
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn recording_configuration(
        &self,
        template: SessionConfiguration,
        output_path: &Path,
    ) -> Result<(SessionConfiguration, Option<Box<dyn RecordingTechnique>>), SessionError> {
        match &self.technique {
            Technique::File => {
                let (technique, sink) = FileRecordingTechnique::create(output_path)?;
                Ok((template.with_recording(sink), Some(Box::new(technique))))
            }
            Technique::Counting(finished) => {
                fs::write(output_path, b"").map_err(|source| StorageError::Create {
                    path: output_path.to_path_buf(),
                    source,
                })?;
                let technique = CountingTechnique {
                    output_path: output_path.to_path_buf(),
                    finished: Arc::clone(finished),
                };
                Ok((template, Some(Box::new(technique))))
            }
            Technique::Missing => Ok((template, None)),
        }
    }
}

struct Harness {
    _temp_dir: TempDir,
    store: ReplayStore,
    session: ScriptedSession,
    machine: SessionStateMachine<ScriptedSession>,
    _events: mpsc::UnboundedReceiver<SessionEvent>,
}

fn harness(technique: Technique) -> Result<Harness> {
    let temp_dir = TempDir::new()?;
    let store = ReplayStore::open(temp_dir.path())?;
    let session = ScriptedSession::new(technique);
    let (tx, events) = mpsc::unbounded_channel();

    let machine = SessionStateMachine::new(
        session.clone(),
        store.clone(),
        ReplayFormatResolver::new(ReplayOptions::default()),
        TrackingOptions::default(),
        tx,
    );

    Ok(Harness {
        _temp_dir: temp_dir,
        store,
        session,
        machine,
        _events: events,
    })
}

fn write_replay(store: &ReplayStore, name: &str) -> Result<PathBuf> {
    let path = store.location().join(name);
    let header = ReplayHeader::current().encode()?;
    let frame = SensorFrame {
        sequence: 0,
        timestamp: 0.0,
    }
    .encode()?;
    fs::write(&path, format!("{}\n{}\n", header, frame))?;
    Ok(path)
}

fn event(epoch: u64, event: ReplayEvent) -> SessionEvent {
    SessionEvent { epoch, event }
}

fn loading_finished() -> ReplayEvent {
    ReplayEvent::LoadingFinished {
        start: 0.0,
        end: 1.0,
    }
}

#[tokio::test]
async fn test_appear_starts_live_session() -> Result<()> {
    let mut h = harness(Technique::File)?;
    assert_eq!(h.machine.kind(), ModeKind::Idle);
    assert_eq!(h.machine.status().title.as_deref(), Some("Session Idle"));

    let mode = h.machine.appear().await?;

    assert_eq!(mode, ModeKind::Normal);
    assert_eq!(h.machine.session().name(), "scripted");
    assert_eq!(
        h.session.calls(),
        vec![Call::Run {
            label: "base",
            options: RunOptions::RESUME
        }]
    );

    // A second appearance leaves the running session alone
    h.machine.appear().await?;
    assert_eq!(h.session.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_appear_failure_stays_idle() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.session.fail_runs(true);

    let result = h.machine.appear().await;

    assert!(matches!(result, Err(SessionError::StartFailed { .. })));
    assert_eq!(h.machine.kind(), ModeKind::Idle);
    assert!(h.machine.status().last_error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_record_cycle_offers_matching_actions() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.machine.appear().await?;

    let status = h.machine.status();
    assert_eq!(status.title, None);
    assert_eq!(status.leading_actions, vec![Action::StartRecording]);
    assert_eq!(status.trailing_actions, vec![Action::StartReplay]);

    let path = h.machine.start_recording().await?;

    let status = h.machine.status();
    assert_eq!(status.mode, ModeKind::Recording);
    assert_eq!(status.title.as_deref(), Some("RECORDING"));
    assert_eq!(status.leading_actions, vec![Action::StopRecording]);
    assert!(status.trailing_actions.is_empty());
    assert_eq!(status.recording_path.as_ref(), Some(&path));
    assert_eq!(
        h.session.last_call(),
        Some(Call::Run {
            label: "recording",
            options: RunOptions::RESET
        })
    );

    h.machine.stop_recording().await?;

    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert_eq!(h.machine.status().recording_path, None);
    assert_eq!(
        h.session.last_call(),
        Some(Call::Run {
            label: "base",
            options: RunOptions::RESUME
        })
    );
    assert_eq!(h.store.enumerate()?, vec![path]);
    Ok(())
}

#[tokio::test]
async fn test_recording_is_finished_exactly_once() -> Result<()> {
    let finished = Arc::new(AtomicUsize::new(0));
    let mut h = harness(Technique::Counting(Arc::clone(&finished)))?;
    h.machine.appear().await?;

    h.machine.start_recording().await?;
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    h.machine.stop_recording().await?;
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    h.machine.shutdown().await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_while_recording_finishes_recording() -> Result<()> {
    let finished = Arc::new(AtomicUsize::new(0));
    let mut h = harness(Technique::Counting(Arc::clone(&finished)))?;
    h.machine.appear().await?;
    h.machine.start_recording().await?;

    h.machine.shutdown().await;

    assert_eq!(h.machine.kind(), ModeKind::Idle);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.last_call(), Some(Call::Pause));
    Ok(())
}

#[tokio::test]
async fn test_failed_recording_start_is_discarded() -> Result<()> {
    let finished = Arc::new(AtomicUsize::new(0));
    let mut h = harness(Technique::Counting(Arc::clone(&finished)))?;
    h.machine.appear().await?;
    h.session.fail_runs(true);

    let result = h.machine.start_recording().await;

    assert!(matches!(result, Err(SessionError::StartFailed { .. })));
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(h.store.enumerate()?.is_empty(), "Unused recording is removed");
    assert!(h.machine.status().last_error.is_some());
    Ok(())
}

#[tokio::test]
#[cfg_attr(
    debug_assertions,
    should_panic(expected = "recording configuration produced no technique")
)]
async fn test_missing_technique_is_an_error() {
    let mut h = harness(Technique::Missing).unwrap();
    h.machine.appear().await.unwrap();

    let result = h.machine.start_recording().await;

    assert!(matches!(result, Err(SessionError::MissingCapability(_))));
    assert_eq!(h.machine.kind(), ModeKind::Normal);
}

#[tokio::test]
async fn test_actions_outside_their_mode_are_rejected() -> Result<()> {
    let mut h = harness(Technique::File)?;

    let result = h.machine.start_recording().await;
    assert!(matches!(
        result,
        Err(SessionError::ActionUnavailable {
            action: Action::StartRecording,
            mode: ModeKind::Idle
        })
    ));

    h.machine.appear().await?;
    h.session.clear();

    assert!(h.machine.stop_recording().await.is_err());
    assert!(h.machine.stop_replay().await.is_err());
    assert!(h.session.calls().is_empty(), "Rejected actions touch nothing");
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_picker_changes_nothing() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.machine.appear().await?;
    h.session.clear();

    let backend = h.machine.start_replay(None).await?;

    assert_eq!(backend, None);
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert!(h.session.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_replay_start_pauses_then_resets() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;
    h.session.clear();

    let backend = h.machine.start_replay(Some(path.clone())).await?;

    assert!(backend.is_some());
    if cfg!(feature = "modern-replay") {
        assert_eq!(backend, Some(ReplayBackend::Modern));
    }
    assert_eq!(
        h.session.calls(),
        vec![
            Call::Pause,
            Call::Run {
                label: "replay",
                options: RunOptions::RESET
            }
        ]
    );

    let status = h.machine.status();
    assert_eq!(status.mode, ModeKind::LoadingReplay);
    assert_eq!(status.title.as_deref(), Some("Loading…"));
    assert!(status.leading_actions.is_empty());
    assert!(status.trailing_actions.is_empty());
    assert_eq!(status.replay_path, Some(path));
    Ok(())
}

#[tokio::test]
async fn test_both_loading_notifications_transition_once() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;
    h.machine.start_replay(Some(path)).await?;

    let first = h
        .machine
        .handle_event(event(1, ReplayEvent::FramesLoaded { count: 1 }))
        .await;
    let second = h.machine.handle_event(event(1, loading_finished())).await;

    assert!(first);
    assert!(!second);
    assert_eq!(h.machine.kind(), ModeKind::Replaying);
    assert_eq!(h.machine.status().title.as_deref(), Some("REPLAYING"));
    Ok(())
}

#[tokio::test]
async fn test_notifications_from_old_replay_are_dropped() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;

    h.machine.start_replay(Some(path.clone())).await?;
    h.machine.handle_event(event(1, loading_finished())).await;
    h.machine.stop_replay().await?;
    h.machine.start_replay(Some(path)).await?;

    let stale = h.machine.handle_event(event(1, loading_finished())).await;
    assert!(!stale);
    assert_eq!(h.machine.kind(), ModeKind::LoadingReplay);

    let current = h.machine.handle_event(event(2, loading_finished())).await;
    assert!(current);
    assert_eq!(h.machine.kind(), ModeKind::Replaying);
    Ok(())
}

#[tokio::test]
async fn test_notifications_outside_replay_are_ignored() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.machine.appear().await?;

    let changed = h
        .machine
        .handle_event(event(0, ReplayEvent::ReplayExhausted))
        .await;

    assert!(!changed);
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_replay_pauses_session() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;
    h.machine.start_replay(Some(path)).await?;

    // Exhaustion before loading completes does not skip Replaying
    assert!(
        !h.machine
            .handle_event(event(1, ReplayEvent::ReplayExhausted))
            .await
    );

    h.machine.handle_event(event(1, loading_finished())).await;
    h.session.clear();
    assert!(
        h.machine
            .handle_event(event(1, ReplayEvent::ReplayExhausted))
            .await
    );

    let status = h.machine.status();
    assert_eq!(status.mode, ModeKind::ReplayFinished);
    assert_eq!(status.title.as_deref(), Some("Replay Finished"));
    assert_eq!(status.leading_actions, vec![Action::StopReplay]);
    assert_eq!(h.session.calls(), vec![Call::Pause]);

    h.machine.stop_replay().await?;

    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert_eq!(h.machine.status().replay_path, None);
    assert_eq!(
        h.session.last_call(),
        Some(Call::Run {
            label: "base",
            options: RunOptions::RESET
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_load_failure_returns_to_live_session() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;
    h.machine.start_replay(Some(path)).await?;
    h.session.clear();

    let changed = h
        .machine
        .handle_event(event(
            1,
            ReplayEvent::LoadFailed {
                reason: "bad frame".to_string(),
            },
        ))
        .await;

    assert!(changed);
    let status = h.machine.status();
    assert_eq!(status.mode, ModeKind::Normal);
    assert_eq!(status.last_error.as_deref(), Some("bad frame"));
    assert_eq!(status.replay_path, None);
    assert_eq!(
        h.session.calls(),
        vec![Call::Run {
            label: "base",
            options: RunOptions::RESET
        }]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_replay_start_restores_normal() -> Result<()> {
    let mut h = harness(Technique::File)?;
    let path = write_replay(&h.store, "take.mov")?;
    h.machine.appear().await?;
    h.session.fail_runs(true);

    let result = h.machine.start_replay(Some(path)).await;

    assert!(matches!(result, Err(SessionError::StartFailed { .. })));
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert_eq!(h.machine.status().replay_path, None);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_replay_is_rejected_before_pausing() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.machine.appear().await?;
    h.session.clear();

    let missing = h.store.location().join("missing.mov");
    let result = h.machine.start_replay(Some(missing)).await;

    assert!(matches!(result, Err(SessionError::Replay(_))));
    assert_eq!(h.machine.kind(), ModeKind::Normal);
    assert!(h.session.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_replays_in_use_cannot_be_deleted() -> Result<()> {
    let mut h = harness(Technique::File)?;
    h.machine.appear().await?;

    let recording = h.machine.start_recording().await?;
    let result = h.machine.delete_replay(&recording);
    assert!(matches!(result, Err(StorageError::InUse(_))));
    h.machine.stop_recording().await?;

    h.machine.start_replay(Some(recording.clone())).await?;
    let result = h.machine.delete_replay(&recording);
    assert!(matches!(result, Err(StorageError::InUse(_))));

    h.machine.handle_event(event(1, loading_finished())).await;
    assert_eq!(h.machine.kind(), ModeKind::Replaying);
    let err = h.machine.delete_replay(&recording).unwrap_err();
    assert!(matches!(err, StorageError::InUse(_)));
    assert!(err.to_string().starts_with("replay is in use"), "{}", err);
    h.machine.stop_replay().await?;

    h.machine.delete_replay(&recording)?;
    assert!(h.machine.list_replays()?.is_empty());
    Ok(())
}
