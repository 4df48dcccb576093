//! Configuration for the multiplayer client.

use crate::error::{MultiplayerError, MultiplayerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default per-subscriber event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Multiplayer client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplayerConfig {
    /// Number of events buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
    /// Pending transaction count above which a warning is logged.
    ///
    /// The offline queue itself is unbounded; `None` disables the warning.
    pub queue_warn_threshold: Option<usize>,
    /// File used to persist the offline queue.
    pub storage_path: Option<PathBuf>,
    /// Persist the offline queue after every mutation.
    pub auto_save: bool,
}

impl Default for MultiplayerConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            queue_warn_threshold: None,
            storage_path: None,
            auto_save: false,
        }
    }
}

impl MultiplayerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-subscriber event buffer.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the pending transaction warning threshold.
    pub fn with_queue_warn_threshold(mut self, threshold: usize) -> Self {
        self.queue_warn_threshold = Some(threshold);
        self
    }

    /// Persist the offline queue to `path`, saving after every mutation.
    pub fn with_storage(mut self, path: impl AsRef<Path>) -> Self {
        self.storage_path = Some(path.as_ref().to_path_buf());
        self.auto_save = true;
        self
    }

    /// Enable or disable auto-save.
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> MultiplayerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MultiplayerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> MultiplayerResult<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MultiplayerError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> MultiplayerResult<()> {
        if self.event_capacity == 0 {
            return Err(MultiplayerError::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.auto_save && self.storage_path.is_none() {
            return Err(MultiplayerError::Config(
                "auto_save requires storage_path".to_string(),
            ));
        }
        Ok(())
    }
}
