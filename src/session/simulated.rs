use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::config::{Attachment, RunOptions, SessionConfiguration};
use super::engine::TrackingSession;
use crate::error::SessionError;
use crate::recording::RecordingSink;
use crate::replay::{ReplaySensor, SensorFrame};

/// In-process tracking session.
///
/// Live sensing is a timer producing empty frames at a fixed rate; recording
/// writes those frames through the configuration's sink and replay hands
/// control to the configuration's sensor.
#[derive(Debug)]
pub struct SimulatedSession {
    frame_rate: u32,
    available: bool,
    running: bool,
    tracking_resets: u64,
    capture: Option<JoinHandle<()>>,
    replay: Option<Box<dyn ReplaySensor>>,
}

impl SimulatedSession {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            available: true,
            running: false,
            tracking_resets: 0,
            capture: None,
            replay: None,
        }
    }

    /// A session whose sensor cannot be started
    pub fn unavailable(frame_rate: u32) -> Self {
        let mut session = Self::new(frame_rate);
        session.available = false;
        session
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// How many runs started from a fresh tracking state
    pub fn tracking_resets(&self) -> u64 {
        self.tracking_resets
    }

    fn teardown(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.abort();
        }
        if let Some(mut sensor) = self.replay.take() {
            sensor.stop();
        }
    }

    fn spawn_capture(&self, sink: RecordingSink) -> JoinHandle<()> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.frame_rate));

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);

            for sequence in 0u64.. {
                ticker.tick().await;

                let frame = SensorFrame {
                    sequence,
                    timestamp: started.elapsed().as_secs_f64(),
                };
                match sink.write_frame(&frame) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        error!(
                            "Failed to write frame to {}: {}",
                            sink.output_path().display(),
                            e
                        );
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl TrackingSession for SimulatedSession {
    async fn run(
        &mut self,
        configuration: SessionConfiguration,
        options: RunOptions,
    ) -> Result<(), SessionError> {
        if !self.available {
            return Err(SessionError::start_failed("simulated sensor is unavailable"));
        }

        self.teardown();
        if options.reset_tracking {
            self.tracking_resets += 1;
        }

        info!(
            "Running simulated session ({} configuration, reset={})",
            configuration.label(),
            options.reset_tracking
        );

        match configuration.attachment {
            Attachment::None => {}
            Attachment::Recording(sink) => {
                self.capture = Some(self.spawn_capture(sink));
            }
            Attachment::Replay(mut sensor) => {
                sensor.load_async();
                self.replay = Some(sensor);
            }
        }

        self.running = true;
        Ok(())
    }

    async fn pause(&mut self) {
        if self.running {
            info!("Pausing simulated session");
        }
        self.teardown();
        self.running = false;
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
