//! Replay container used by the simulated engine.
//!
//! Second-generation files start with a `#replay` header line carrying
//! metadata; first-generation files are bare frame lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ReplayError;

pub const HEADER_PREFIX: &str = "#replay ";

/// Metadata written at the top of second-generation replays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayHeader {
    /// Engine version the replay was recorded with
    pub engine_version: String,

    /// Operating system the replay was recorded on
    pub os_version: Option<String>,

    /// Device the replay was recorded on
    pub device_model: Option<String>,

    pub recorded_at: DateTime<Utc>,
}

impl ReplayHeader {
    /// Header describing a recording made by this build on this machine
    pub fn current() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            os_version: Some(std::env::consts::OS.to_string()),
            device_model: Some(std::env::consts::ARCH.to_string()),
            recorded_at: Utc::now(),
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        Ok(format!("{}{}", HEADER_PREFIX, serde_json::to_string(self)?))
    }
}

/// One captured sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub sequence: u64,

    /// Seconds since the recording started
    pub timestamp: f64,
}

impl SensorFrame {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Read just the first line of a replay and decode its header, if any.
pub fn probe_header(path: &Path) -> Result<Option<ReplayHeader>, ReplayError> {
    let file = File::open(path).map_err(|source| ReplayError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    match first_line.trim_end().strip_prefix(HEADER_PREFIX) {
        Some(json) => serde_json::from_str(json)
            .map(Some)
            .map_err(|source| ReplayError::Header {
                path: path.to_path_buf(),
                source,
            }),
        None => Ok(None),
    }
}

/// Decode every frame in a replay.
///
/// With `accept_header` unset a header line is treated as a malformed frame,
/// which is how first-generation readers see second-generation files.
pub async fn read_frames(
    path: &Path,
    accept_header: bool,
) -> Result<Vec<SensorFrame>, ReplayError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReplayError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    parse_frames(path, &contents, accept_header)
}

fn parse_frames(
    path: &Path,
    contents: &str,
    accept_header: bool,
) -> Result<Vec<SensorFrame>, ReplayError> {
    let mut frames = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if index == 0 && accept_header && line.starts_with(HEADER_PREFIX.trim_end()) {
            continue;
        }

        let frame = serde_json::from_str(line).map_err(|source| ReplayError::Frame {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        frames.push(frame);
    }

    Ok(frames)
}
