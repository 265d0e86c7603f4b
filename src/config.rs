//! JSON configuration for a tracker.
//!
//! ```json
//! {
//!   "tag_specs": {
//!     "a": {"trackType": "count", "opts": {"reqd": 3}},
//!     "b": {"trackType": "count", "opts": {"reqd": 5}}
//!   },
//!   "start_tracking": false
//! }
//! ```
//!
//! `tag_specs` accepts every shape [`normalize`](crate::spec::normalize)
//! does and may be omitted. `start_tracking` defaults to `true`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::spec::RawTagSpecs;

/// Construction-time configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Raw tag specification; `None` declares no tags.
    #[serde(default, alias = "tagSpecs")]
    pub tag_specs: Option<serde_json::Value>,
    /// Whether the tracker starts armed.
    #[serde(default = "default_start_tracking", alias = "startTracking")]
    pub start_tracking: bool,
}

const fn default_start_tracking() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tag_specs: None,
            start_tracking: default_start_tracking(),
        }
    }
}

impl TrackerConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The tag specification, classified by shape.
    #[must_use]
    pub fn raw_tag_specs(&self) -> RawTagSpecs {
        RawTagSpecs::from(self.tag_specs.clone())
    }
}
