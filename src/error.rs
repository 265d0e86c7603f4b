//! Error types for the completion tracker.
//!
//! Malformed tag specifications and posts to undeclared tags never produce
//! errors; they degrade to warnings and notifications. What remains here are
//! failures raised by notification sinks, configuration loading problems,
//! and internal faults such as a poisoned lock.

use std::path::PathBuf;

use thiserror::Error;

use crate::notify::NotificationKind;

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Handler for '{kind}' notification failed: {message}")]
    Handler {
        kind: NotificationKind,
        message: String,
    },

    #[error("Notification channel disconnected: {path}")]
    Disconnected {
        path: String,
    },
}

impl SinkError {
    /// Creates a handler failure for the given notification kind.
    #[must_use]
    pub fn handler(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self::Handler {
            kind,
            message: message.into(),
        }
    }
}

/// Errors loading a tracker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

/// Top-level error type for the completion tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl TrackerError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised by a notification sink.
    #[must_use]
    pub const fn is_sink(&self) -> bool {
        matches!(self, Self::Sink(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
