//! Observer registry with per-kind handlers.
//!
//! Handlers run synchronously in registration order. A handler may be
//! limited to one notification kind and, optionally, to tags matching a
//! regular expression. The first handler error stops dispatch and is
//! returned to the publisher.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SinkError;

use super::{Notification, NotificationKind, NotificationSink};

/// Handler invoked for each matching notification.
pub type Handler = Box<dyn FnMut(&Notification) -> Result<(), SinkError> + Send>;

/// Unique identifier for a registered handler.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    kind: Option<NotificationKind>,
    tag_filter: Option<Regex>,
    handler: Handler,
}

impl Subscription {
    fn matches(&self, notification: &Notification) -> bool {
        if self.kind.is_some_and(|k| k != notification.kind()) {
            return false;
        }
        match &self.tag_filter {
            None => true,
            Some(re) => notification.tag().is_some_and(|tag| re.is_match(tag)),
        }
    }
}

/// In-process observer registry.
///
/// Handlers run synchronously in registration order. The first handler that
/// returns an error stops dispatch of that notification and the error is
/// returned to the publisher.
#[derive(Default)]
pub struct Subscribers {
    entries: Vec<Subscription>,
}

impl Subscribers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one notification kind.
    pub fn on<F>(&mut self, kind: NotificationKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) -> Result<(), SinkError> + Send + 'static,
    {
        self.register(Some(kind), None, Box::new(handler))
    }

    /// Registers a handler for every notification.
    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) -> Result<(), SinkError> + Send + 'static,
    {
        self.register(None, None, Box::new(handler))
    }

    /// Registers a handler for notifications of `kind` whose tag matches
    /// `pattern`. Tagless notifications never match.
    pub fn on_tag_matching<F>(
        &mut self,
        kind: NotificationKind,
        pattern: &str,
        handler: F,
    ) -> Result<SubscriptionId, regex::Error>
    where
        F: FnMut(&Notification) -> Result<(), SinkError> + Send + 'static,
    {
        let re = Regex::new(pattern)?;
        Ok(self.register(Some(kind), Some(re), Box::new(handler)))
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, kind: Option<NotificationKind>, tag_filter: Option<Regex>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.entries.push(Subscription {
            id,
            kind,
            tag_filter,
            handler,
        });
        id
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl NotificationSink for Subscribers {
    fn publish(&mut self, notification: &Notification) -> Result<(), SinkError> {
        for sub in &mut self.entries {
            if sub.matches(notification) {
                (sub.handler)(notification)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::notify::{NotificationPayload, COMPLETE_MESSAGE};
    use crate::spec::TrackType;

    fn post(tag: &str) -> Notification {
        Notification::new(NotificationPayload::Post {
            tag: tag.to_string(),
            message: format!("Held post to {tag} (1)"),
            track_type: TrackType::Hold,
            count: 0,
            holding: true,
        })
    }

    fn complete() -> Notification {
        Notification::new(NotificationPayload::Complete {
            message: COMPLETE_MESSAGE.to_string(),
        })
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&Notification) -> Result<(), SinkError> + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |n: &Notification| {
            sink.lock().unwrap().push(n.message().to_string());
            Ok(())
        })
    }

    #[test]
    fn test_routes_by_kind() {
        let mut subs = Subscribers::new();
        let (posts, on_post) = recorder();
        let (completes, on_complete) = recorder();
        subs.on(NotificationKind::Post, on_post);
        subs.on(NotificationKind::Complete, on_complete);

        subs.publish(&post("a")).unwrap();
        subs.publish(&complete()).unwrap();

        assert_eq!(posts.lock().unwrap().len(), 1);
        assert_eq!(completes.lock().unwrap().as_slice(), &[COMPLETE_MESSAGE.to_string()]);
    }

    #[test]
    fn test_on_any_sees_everything() {
        let mut subs = Subscribers::new();
        let (seen, handler) = recorder();
        subs.on_any(handler);
        subs.publish(&post("a")).unwrap();
        subs.publish(&complete()).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_tag_filter() {
        let mut subs = Subscribers::new();
        let (seen, handler) = recorder();
        subs.on_tag_matching(NotificationKind::Post, "^sub-", handler).unwrap();

        subs.publish(&post("sub-db")).unwrap();
        subs.publish(&post("net")).unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &["Held post to sub-db (1)".to_string()]);
    }

    #[test]
    fn test_bad_tag_pattern_is_rejected() {
        let mut subs = Subscribers::new();
        assert!(subs.on_tag_matching(NotificationKind::Post, "(", |_| Ok(())).is_err());
        assert!(subs.is_empty());
    }

    #[test]
    fn test_off_removes_handler() {
        let mut subs = Subscribers::new();
        let (seen, handler) = recorder();
        let id = subs.on_any(handler);
        assert!(subs.off(id));
        assert!(!subs.off(id));
        subs.publish(&post("a")).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_first_error_stops_dispatch() {
        let mut subs = Subscribers::new();
        let (seen, handler) = recorder();
        subs.on_any(|n| Err(SinkError::handler(n.kind(), "refused")));
        subs.on_any(handler);

        let err = subs.publish(&post("a")).unwrap_err();
        assert!(matches!(err, SinkError::Handler { kind: NotificationKind::Post, .. }));
        assert!(seen.lock().unwrap().is_empty());
    }
}
