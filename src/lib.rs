pub mod config;
pub mod error;
pub mod http;
pub mod recording;
pub mod replay;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{ReplayError, SessionError, StorageError};
pub use http::{create_router, AppState};
pub use recording::{FileRecordingTechnique, RecordingSink, RecordingTechnique};
#[cfg(feature = "modern-replay")]
pub use replay::ModernReplaySensor;
pub use replay::{
    LegacyReplaySensor, ReplayBackend, ReplayEvent, ReplayEventSink, ReplayFormatResolver,
    ReplayOptions, ReplaySensor, SessionEvent,
};
pub use session::{
    Action, Mode, ModeKind, RunOptions, SessionConfiguration, SessionController, SessionHandle,
    SessionStateMachine, SessionStatus, SimulatedSession, TrackingOptions, TrackingSession,
};
pub use storage::ReplayStore;
