use std::path::Path;
use tracing::info;

use super::legacy::LegacyReplaySensor;
#[cfg(feature = "modern-replay")]
use super::modern::ModernReplaySensor;
use super::sensor::{ReplayOptions, ReplaySensor};
use crate::error::ReplayError;

/// Picks the replay reader that can load a given file.
///
/// The second-generation reader is tried first; its header probe decides
/// whether the file really is second-generation, so the file is never
/// parsed twice.
#[derive(Debug, Clone)]
pub struct ReplayFormatResolver {
    options: ReplayOptions,
    #[cfg_attr(not(feature = "modern-replay"), allow(dead_code))]
    modern_enabled: bool,
}

impl ReplayFormatResolver {
    pub fn new(options: ReplayOptions) -> Self {
        Self {
            options,
            modern_enabled: cfg!(feature = "modern-replay"),
        }
    }

    /// Resolver that always uses the first-generation reader
    pub fn legacy_only(options: ReplayOptions) -> Self {
        Self {
            options,
            modern_enabled: false,
        }
    }

    pub fn modern_enabled(&self) -> bool {
        cfg!(feature = "modern-replay") && self.modern_enabled
    }

    pub fn resolve(&self, path: &Path) -> Result<Box<dyn ReplaySensor>, ReplayError> {
        #[cfg(feature = "modern-replay")]
        if self.modern_enabled {
            let modern = ModernReplaySensor::open(path, self.options.clone())?;
            if modern.engine_version().is_some() {
                info!("Replay {} uses the modern format", path.display());
                return Ok(Box::new(modern));
            }
            tracing::debug!(
                "Replay {} has no version header, falling back to legacy reader",
                path.display()
            );
        }

        info!("Replay {} uses the legacy format", path.display());
        Ok(Box::new(LegacyReplaySensor::open(path, self.options.clone())?))
    }
}

impl Default for ReplayFormatResolver {
    fn default() -> Self {
        Self::new(ReplayOptions::default())
    }
}
