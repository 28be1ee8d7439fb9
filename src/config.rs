use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::replay::{ReplayFormatResolver, ReplayOptions};
use crate::session::{PlaneDetection, TrackingOptions};
use crate::storage::{ReplayStore, DEFAULT_NAME_FORMAT, DEFAULT_REPLAY_EXTENSION};

/// Environment variable prefix, e.g. `REPLAY_RECORDER__SERVICE__HTTP__PORT=9000`
pub const ENV_PREFIX: &str = "REPLAY_RECORDER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub tracking: TrackingConfig,
    pub replay: ReplayConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory replays are kept in; `~` is expanded
    pub replays_path: String,
    pub extension: String,
    /// chrono format string used to name new replays
    pub name_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    pub plane_detection: Vec<PlaneDetection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub speed_multiplier: f64,
    /// Try the second-generation reader before the legacy one
    pub modern_backend: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub frame_rate: u32,
    pub available: bool,
}

impl Config {
    /// Load defaults, then `path` (any format the `config` crate knows, if
    /// present), then `REPLAY_RECORDER__*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "replay-recorder")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8787)?
            .set_default("storage.replays_path", "~/.replay-recorder/replays")?
            .set_default("storage.extension", DEFAULT_REPLAY_EXTENSION)?
            .set_default("storage.name_format", DEFAULT_NAME_FORMAT)?
            .set_default("tracking.plane_detection", vec!["horizontal", "vertical"])?
            .set_default("replay.speed_multiplier", 1.0)?
            .set_default("replay.modern_backend", true)?
            .set_default("simulation.frame_rate", 30)?
            .set_default("simulation.available", true)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn replays_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.replays_path).into_owned())
    }

    /// Open the replay store, creating its directory if needed
    pub fn replay_store(&self) -> Result<ReplayStore> {
        let store = ReplayStore::open(self.replays_path())
            .context("Failed to open replay storage")?
            .with_extension(self.storage.extension.clone())
            .with_name_format(self.storage.name_format.clone());
        Ok(store)
    }

    pub fn replay_resolver(&self) -> ReplayFormatResolver {
        let options = ReplayOptions {
            speed_multiplier: self.replay.speed_multiplier,
        };
        if self.replay.modern_backend {
            ReplayFormatResolver::new(options)
        } else {
            ReplayFormatResolver::legacy_only(options)
        }
    }

    pub fn tracking_options(&self) -> TrackingOptions {
        TrackingOptions {
            plane_detection: self.tracking.plane_detection.clone(),
        }
    }
}
