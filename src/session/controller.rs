use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::TrackingOptions;
use super::engine::TrackingSession;
use super::machine::SessionStateMachine;
use super::mode::ModeKind;
use super::status::SessionStatus;
use crate::error::{Result, SessionError};
use crate::replay::{ReplayBackend, ReplayFormatResolver, SessionEvent};
use crate::storage::ReplayStore;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Appear(Reply<ModeKind>),
    StartRecording(Reply<PathBuf>),
    StopRecording(Reply<()>),
    StartReplay(Option<PathBuf>, Reply<Option<ReplayBackend>>),
    StopReplay(Reply<()>),
    ListReplays(Reply<Vec<PathBuf>>),
    DeleteReplay(PathBuf, Reply<()>),
    Status(Reply<SessionStatus>),
    Shutdown(Reply<()>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Appear(_) => "Appear",
            Self::StartRecording(_) => "StartRecording",
            Self::StopRecording(_) => "StopRecording",
            Self::StartReplay(..) => "StartReplay",
            Self::StopReplay(_) => "StopReplay",
            Self::ListReplays(_) => "ListReplays",
            Self::DeleteReplay(..) => "DeleteReplay",
            Self::Status(_) => "Status",
            Self::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Task that owns a [`SessionStateMachine`].
///
/// User requests arrive as commands and replay notifications on the event
/// channel; both are applied one at a time, notifications first so that
/// they keep the order the session emitted them in.
pub struct SessionController<S> {
    machine: SessionStateMachine<S>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    status: watch::Sender<SessionStatus>,
}

impl<S: TrackingSession + 'static> SessionController<S> {
    pub fn new(
        session: S,
        store: ReplayStore,
        resolver: ReplayFormatResolver,
        tracking: TrackingOptions,
    ) -> (Self, SessionHandle) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::channel(32);

        let machine = SessionStateMachine::new(session, store, resolver, tracking, events_tx);
        let (status, status_rx) = watch::channel(machine.status());

        let controller = Self {
            machine,
            commands,
            events,
            status,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            status: status_rx,
        };

        (controller, handle)
    }

    /// Build a controller and run it on its own task
    pub fn spawn(
        session: S,
        store: ReplayStore,
        resolver: ReplayFormatResolver,
        tracking: TrackingOptions,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (controller, handle) = Self::new(session, store, resolver, tracking);
        (handle, tokio::spawn(controller.run()))
    }

    pub async fn run(mut self) {
        info!("Session controller started");

        loop {
            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    self.machine.handle_event(event).await;
                }

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.machine.shutdown().await;
                        self.publish();
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    Some(command) => self.dispatch(command).await,
                    None => {
                        debug!("All session handles dropped");
                        self.machine.shutdown().await;
                        self.publish();
                        break;
                    }
                },
            }

            self.publish();
        }

        info!("Session controller stopped");
    }

    async fn dispatch(&mut self, command: Command) {
        let machine = &mut self.machine;

        // A dropped reply receiver only means the caller stopped waiting
        match command {
            Command::Appear(reply) => {
                let _ = reply.send(machine.appear().await);
            }
            Command::StartRecording(reply) => {
                let _ = reply.send(machine.start_recording().await);
            }
            Command::StopRecording(reply) => {
                let _ = reply.send(machine.stop_recording().await);
            }
            Command::StartReplay(selection, reply) => {
                let _ = reply.send(machine.start_replay(selection).await);
            }
            Command::StopReplay(reply) => {
                let _ = reply.send(machine.stop_replay().await);
            }
            Command::ListReplays(reply) => {
                let _ = reply.send(machine.list_replays().map_err(SessionError::from));
            }
            Command::DeleteReplay(path, reply) => {
                let _ = reply.send(machine.delete_replay(&path).map_err(SessionError::from));
            }
            Command::Status(reply) => {
                let _ = reply.send(Ok(machine.status()));
            }
            Command::Shutdown(reply) => {
                machine.shutdown().await;
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn publish(&self) {
        let current = self.machine.status();
        self.status.send_if_modified(|status| {
            if *status == current {
                false
            } else {
                *status = current;
                true
            }
        });
    }
}

/// Cloneable front end to a running [`SessionController`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::ControllerClosed)?;
        response.await.map_err(|_| SessionError::ControllerClosed)?
    }

    /// Start live sensing if the session is still idle
    pub async fn appear(&self) -> Result<ModeKind> {
        self.request(Command::Appear).await
    }

    /// Returns the replay file being recorded
    pub async fn start_recording(&self) -> Result<PathBuf> {
        self.request(Command::StartRecording).await
    }

    pub async fn stop_recording(&self) -> Result<()> {
        self.request(Command::StopRecording).await
    }

    /// Pass the picker's result; `None` is a cancelled selection
    pub async fn start_replay(&self, selection: Option<PathBuf>) -> Result<Option<ReplayBackend>> {
        self.request(|reply| Command::StartReplay(selection, reply)).await
    }

    pub async fn stop_replay(&self) -> Result<()> {
        self.request(Command::StopReplay).await
    }

    pub async fn list_replays(&self) -> Result<Vec<PathBuf>> {
        self.request(Command::ListReplays).await
    }

    pub async fn delete_replay(&self, identifier: PathBuf) -> Result<()> {
        self.request(|reply| Command::DeleteReplay(identifier, reply)).await
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(Command::Status).await
    }

    /// Leave the active mode, stop the session and end the controller task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Command::Shutdown).await
    }

    /// Last published status, without a round trip to the controller
    pub fn current(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the session reaches `mode`
    pub async fn wait_for(&self, mode: ModeKind) -> Result<SessionStatus> {
        self.wait_until(|status| status.mode == mode).await
    }

    /// Wait until a published status satisfies `predicate`
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus> {
        let mut status = self.subscribe();
        let reached = status
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::ControllerClosed)?;
        Ok(reached.clone())
    }
}
