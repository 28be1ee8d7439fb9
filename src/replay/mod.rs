//! Replay sensors
//!
//! Two generations of replay reader sit behind the [`ReplaySensor`]
//! capability; [`ReplayFormatResolver`] chooses between them per file.

pub mod format;
mod legacy;
#[cfg(feature = "modern-replay")]
mod modern;
mod playback;
mod resolver;
mod sensor;

pub use format::{ReplayHeader, SensorFrame};
pub use legacy::LegacyReplaySensor;
#[cfg(feature = "modern-replay")]
pub use modern::ModernReplaySensor;
pub use resolver::ReplayFormatResolver;
pub use sensor::{
    ReplayBackend, ReplayEvent, ReplayEventSink, ReplayOptions, ReplaySensor, SessionEvent,
};
