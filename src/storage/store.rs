use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::collate::localized_standard_cmp;
use crate::error::StorageError;

/// Extension recorded replays are saved with
pub const DEFAULT_REPLAY_EXTENSION: &str = "mov";

/// Medium date + medium time, e.g. "Oct 17, 2026 at 3:04:05 PM"
pub const DEFAULT_NAME_FORMAT: &str = "%b %-d, %Y at %-I:%M:%S %p";

/// Flat directory of replay artifacts.
///
/// Artifacts are whole files identified by their path. The store only ever
/// adds (by handing out a fresh destination) or removes them.
#[derive(Debug, Clone)]
pub struct ReplayStore {
    location: PathBuf,
    extension: String,
    name_format: String,
}

impl ReplayStore {
    /// Create a store rooted at `location` without touching the filesystem
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            extension: DEFAULT_REPLAY_EXTENSION.to_string(),
            name_format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }

    /// Create a store and make sure its directory exists
    pub fn open(location: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(location);
        fs::create_dir_all(&store.location).map_err(|source| StorageError::DirectoryCreation {
            path: store.location.clone(),
            source,
        })?;

        info!("Replay store ready: {}", store.location.display());
        Ok(store)
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = format.into();
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// List replay artifacts, ordered the way a file browser would show them.
    ///
    /// Only files carrying the replay extension (any case) are returned.
    pub fn enumerate(&self) -> Result<Vec<PathBuf>, StorageError> {
        let enumerate_error = |source| StorageError::Enumerate {
            path: self.location.clone(),
            source,
        };

        let mut replays = Vec::new();
        for entry in fs::read_dir(&self.location).map_err(enumerate_error)? {
            let path = entry.map_err(enumerate_error)?.path();
            if path.is_file() && self.is_replay(&path) {
                replays.push(path);
            }
        }

        replays.sort_by(|a, b| localized_standard_cmp(&file_name(a), &file_name(b)));

        debug!(
            "Found {} replays in {}",
            replays.len(),
            self.location.display()
        );

        Ok(replays)
    }

    /// Destination for a new recording, named after the current local time.
    ///
    /// Names have one-second granularity and are not checked for collisions.
    pub fn allocate_new_identifier(&self) -> PathBuf {
        self.allocate_identifier_at(Local::now())
    }

    pub fn allocate_identifier_at(&self, at: DateTime<Local>) -> PathBuf {
        let timestamp = at.format(&self.name_format).to_string();
        self.location.join(format!("{}.{}", timestamp, self.extension))
    }

    /// Remove a replay artifact.
    ///
    /// Callers holding a cached listing must drop the entry themselves.
    pub fn delete(&self, identifier: &Path) -> Result<(), StorageError> {
        fs::remove_file(identifier).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(identifier.to_path_buf())
            } else {
                StorageError::Delete {
                    path: identifier.to_path_buf(),
                    source,
                }
            }
        })?;

        info!("Deleted replay: {}", identifier.display());
        Ok(())
    }

    /// Turn a bare file name from an external caller into an identifier.
    ///
    /// Rejects anything that would escape the storage directory or that does
    /// not carry the replay extension.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(name);
        let is_bare = candidate.components().count() == 1
            && candidate.file_name().map(|n| n == candidate.as_os_str()) == Some(true);

        if name.is_empty() || !is_bare || !self.is_replay(candidate) {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        let path = self.location.join(candidate);
        if !path.is_file() {
            return Err(StorageError::NotFound(path));
        }

        Ok(path)
    }

    fn is_replay(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
