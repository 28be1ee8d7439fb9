//! HTTP API for driving the session from outside the process
//!
//! Routes:
//! - GET /session - Current mode, title and available actions
//! - POST /session/recording/start - Start recording a new replay
//! - POST /session/recording/stop - Finish the recording
//! - POST /session/replay/start - Replay a stored file (`null` = picker cancelled)
//! - POST /session/replay/stop - Return to live sensing
//! - GET /replays - Stored replays, in display order
//! - DELETE /replays/:name - Delete a stored replay
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, ReplayEntry, StartReplayRequest};
pub use routes::create_router;
pub use state::AppState;
