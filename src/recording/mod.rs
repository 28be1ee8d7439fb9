//! Recording techniques
//!
//! A technique is attached to a session configuration and captures the
//! session's sensor data into a replay file until it is finished.

mod technique;

pub use technique::{FileRecordingTechnique, RecordingSink, RecordingTechnique};
