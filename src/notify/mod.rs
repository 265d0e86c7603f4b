//! Notifications emitted by a tracker.
//!
//! The tracker does not own an event system. It is handed a
//! [`NotificationSink`] and publishes every notification to it
//! synchronously, on the caller's thread, before `post`/`arm` returns. A sink
//! error aborts the operation and propagates to the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SinkError;
use crate::spec::TrackType;

pub mod subscribers;
pub mod stream;

pub use stream::{ChannelSink, NotificationStream};
pub use subscribers::{Subscribers, SubscriptionId};

/// Message carried by the completion notification.
pub const COMPLETE_MESSAGE: &str = "CompletionTracker has received all things";

/// Kind of a notification, used for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Post,
    InvalidTag,
    Complete,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::InvalidTag => "invalid_tag",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification payloads.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// An accepted post.
    Post {
        tag: String,
        message: String,
        /// Policy the post was applied under (after any override).
        track_type: TrackType,
        /// The tag's counter after the post.
        count: u64,
        /// Whether the tag now holds at least one value.
        holding: bool,
    },

    /// A post to an undeclared tag.
    InvalidTag { tag: String, message: String },

    /// Every tag satisfied while armed. Fired once per tracker.
    Complete { message: String },
}

impl NotificationPayload {
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Post { .. } => NotificationKind::Post,
            Self::InvalidTag { .. } => NotificationKind::InvalidTag,
            Self::Complete { .. } => NotificationKind::Complete,
        }
    }

    /// Tag the notification is about, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Post { tag, .. } | Self::InvalidTag { tag, .. } => Some(tag),
            Self::Complete { .. } => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Post { message, .. } | Self::InvalidTag { message, .. } | Self::Complete { message } => message,
        }
    }
}

/// A published notification.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: NotificationPayload,
}

impl Notification {
    /// Wraps a payload with a fresh id and the current time.
    #[must_use]
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.payload.tag()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.payload.message()
    }
}

/// Destination for tracker notifications.
///
/// `publish` runs inline inside `post`/`arm`. Long or blocking work here
/// stalls the poster.
pub trait NotificationSink {
    /// Delivers one notification.
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError>;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&mut self, _notification: &Notification) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Records notifications in order.
impl NotificationSink for Vec<Notification> {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        self.push(notification.clone());
        Ok(())
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        (**self).publish(notification)
    }
}

impl<S: NotificationSink + ?Sized> NotificationSink for Box<S> {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        (**self).publish(notification)
    }
}

/// Publishes to each sink in turn, stopping at the first error.
impl<A: NotificationSink, B: NotificationSink> NotificationSink for (A, B) {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        self.0.publish(notification)?;
        self.1.publish(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_payload() -> NotificationPayload {
        NotificationPayload::Post {
            tag: "a".to_string(),
            message: "Held post to a (3)".to_string(),
            track_type: TrackType::Hold,
            count: 0,
            holding: true,
        }
    }

    #[test]
    fn test_payload_kind_and_tag() {
        let post = post_payload();
        assert_eq!(post.kind(), NotificationKind::Post);
        assert_eq!(post.tag(), Some("a"));

        let complete = NotificationPayload::Complete {
            message: COMPLETE_MESSAGE.to_string(),
        };
        assert_eq!(complete.kind(), NotificationKind::Complete);
        assert_eq!(complete.tag(), None);
        assert_eq!(complete.message(), COMPLETE_MESSAGE);
    }

    #[test]
    fn test_notification_serializes_tagged_payload() {
        let n = Notification::new(NotificationPayload::InvalidTag {
            tag: "zz".to_string(),
            message: "(4) zz".to_string(),
        });
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["payload"]["type"], "invalid_tag");
        assert_eq!(v["payload"]["tag"], "zz");

        let back: Notification = serde_json::from_value(v).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn test_vec_sink_records_in_order() {
        let mut sink: Vec<Notification> = Vec::new();
        sink.publish(&Notification::new(post_payload())).unwrap();
        sink.publish(&Notification::new(NotificationPayload::Complete {
            message: COMPLETE_MESSAGE.to_string(),
        }))
        .unwrap();
        let kinds: Vec<_> = sink.iter().map(Notification::kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Post, NotificationKind::Complete]);
    }

    #[test]
    fn test_pair_sink_publishes_to_both() {
        let mut pair: (Vec<Notification>, Vec<Notification>) = (Vec::new(), Vec::new());
        pair.publish(&Notification::new(post_payload())).unwrap();
        assert_eq!(pair.0.len(), 1);
        assert_eq!(pair.1.len(), 1);
    }
}
