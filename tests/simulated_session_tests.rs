// Tests for the simulated tracking session
//
// These tests verify run/pause bookkeeping and that a recording
// configuration actually receives frames.

use anyhow::Result;
use replay_recorder::{
    RecordingTechnique, RunOptions, SessionConfiguration, SessionError, SimulatedSession,
    TrackingOptions, TrackingSession,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_run_and_pause_track_state() -> Result<()> {
    let mut session = SimulatedSession::new(30);
    assert!(!session.is_running());

    session
        .run(SessionConfiguration::base(TrackingOptions::default()), RunOptions::RESUME)
        .await?;
    assert!(session.is_running());
    assert_eq!(session.tracking_resets(), 0);

    session
        .run(SessionConfiguration::base(TrackingOptions::default()), RunOptions::RESET)
        .await?;
    assert_eq!(session.tracking_resets(), 1);

    session.pause().await;
    assert!(!session.is_running());
    Ok(())
}

#[tokio::test]
async fn test_unavailable_session_does_not_run() {
    let mut session = SimulatedSession::unavailable(30);

    let result = session
        .run(SessionConfiguration::default(), RunOptions::RESUME)
        .await;

    assert!(matches!(result, Err(SessionError::StartFailed { .. })));
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_recording_configuration_captures_frames() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("take.mov");
    let mut session = SimulatedSession::new(100);

    let (configuration, technique) = session.recording_configuration(
        SessionConfiguration::base(TrackingOptions::default()),
        &path,
    )?;
    let technique = technique.expect("simulated session records to file");
    session.run(configuration, RunOptions::RESET).await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    session.pause().await;
    technique.finish_recording()?;

    assert!(fs::read_to_string(&path)?.lines().count() > 1);
    Ok(())
}
