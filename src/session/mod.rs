//! Session mode management
//!
//! This module provides:
//! - `Mode`: the closed set of session modes and the actions each offers
//! - `SessionStateMachine`: validated transitions between modes, driving the tracking session
//! - `SessionController` / `SessionHandle`: single-owner task around the machine
//! - `SimulatedSession`: in-process tracking engine used by the CLI and tests

mod config;
mod controller;
mod engine;
mod machine;
mod mode;
mod simulated;
mod status;

pub use config::{Attachment, PlaneDetection, RunOptions, SessionConfiguration, TrackingOptions};
pub use controller::{SessionController, SessionHandle};
pub use engine::TrackingSession;
pub use machine::SessionStateMachine;
pub use mode::{Action, Mode, ModeKind};
pub use simulated::SimulatedSession;
pub use status::SessionStatus;
