//! Thread-safe tracker handle.
//!
//! [`SharedTracker`] wraps a [`CompletionTracker`] in one mutex. `post`,
//! `post_as`, `arm` and `disarm` hold the lock across the whole
//! record-publish-evaluate-complete sequence, so concurrent posts are
//! applied one at a time and the completion notification is published
//! exactly once. Sinks run while the lock is held: a handler must not call
//! back into the same tracker.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{TrackerError, TrackerResult};
use crate::measure::Measure;
use crate::notify::NotificationSink;
use crate::spec::{RawTagSpecs, TagSpec, TrackType};
use crate::tracker::{CompletionTracker, PostOutcome, TrackerSnapshot};

/// Cloneable, lock-serialized handle to a tracker.
#[derive(Debug)]
pub struct SharedTracker<T, S> {
    inner: Arc<Mutex<CompletionTracker<T, S>>>,
}

impl<T, S> Clone for SharedTracker<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> From<CompletionTracker<T, S>> for SharedTracker<T, S> {
    fn from(tracker: CompletionTracker<T, S>) -> Self {
        Self::new(tracker)
    }
}

impl<T, S> SharedTracker<T, S> {
    #[must_use]
    pub fn new(tracker: CompletionTracker<T, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    fn lock(&self) -> TrackerResult<MutexGuard<'_, CompletionTracker<T, S>>> {
        self.inner
            .lock()
            .map_err(|_| TrackerError::internal("poisoned lock: tracker"))
    }

    fn read(&self) -> MutexGuard<'_, CompletionTracker<T, S>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `f` with exclusive access to the tracker.
    pub fn with<R>(&self, f: impl FnOnce(&mut CompletionTracker<T, S>) -> R) -> TrackerResult<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.read().is_satisfied()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.read().is_armed()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.read().is_complete()
    }

    #[must_use]
    pub fn count(&self, tag: &str) -> Option<u64> {
        self.read().count(tag)
    }

    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.read().tags().into_iter().map(str::to_string).collect()
    }

    #[must_use]
    pub fn spec(&self, tag: &str) -> Option<TagSpec> {
        self.read().spec(tag).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.read().snapshot()
    }
}

impl<T: Clone, S> SharedTracker<T, S> {
    /// Cloned form of [`CompletionTracker::posted_to`].
    #[must_use]
    pub fn posted_to(&self, tag: &str) -> Option<Vec<Option<T>>> {
        self.read()
            .posted_to(tag)
            .map(|values| values.into_iter().map(|v| v.cloned()).collect())
    }

    /// Cloned form of [`CompletionTracker::thing`].
    #[must_use]
    pub fn thing(&self, tag: &str) -> Option<Vec<Option<T>>> {
        self.posted_to(tag)
    }

    /// Cloned form of [`CompletionTracker::things`].
    #[must_use]
    pub fn things(&self, tag: &str) -> Option<Vec<T>> {
        self.read().things(tag).map(<[T]>::to_vec)
    }
}

impl<T: Measure, S: NotificationSink> SharedTracker<T, S> {
    pub fn post(&self, tag: &str, value: T) -> TrackerResult<PostOutcome> {
        self.lock()?.post(tag, value)
    }

    pub fn post_as(&self, tag: &str, value: T, override_type: Option<TrackType>) -> TrackerResult<PostOutcome> {
        self.lock()?.post_as(tag, value, override_type)
    }
}

impl<T, S: NotificationSink> SharedTracker<T, S> {
    pub fn arm(&self) -> TrackerResult<bool> {
        self.lock()?.arm()
    }

    pub fn disarm(&self) -> TrackerResult<()> {
        self.lock()?.disarm();
        Ok(())
    }

    pub fn configure(&self, raw: &RawTagSpecs, start_tracking: bool) -> TrackerResult<()> {
        self.lock()?.configure(raw, start_tracking);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notification, NotificationKind};
    use crate::spec::TagSpecs;

    #[test]
    fn test_clones_share_state() {
        let tracker: CompletionTracker<String, Vec<Notification>> =
            CompletionTracker::new(TagSpecs::new().with(TagSpec::collect("c", 2)), Vec::new());
        let a = SharedTracker::new(tracker);
        let b = a.clone();

        a.post("c", "1".to_string()).unwrap();
        b.post("c", "2".to_string()).unwrap();

        assert!(a.is_complete());
        assert_eq!(b.things("c"), Some(vec!["1".to_string(), "2".to_string()]));
        let kinds = a
            .with(|t| t.sink().iter().map(Notification::kind).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(
            kinds,
            vec![NotificationKind::Post, NotificationKind::Post, NotificationKind::Complete]
        );
    }

    #[test]
    fn test_accessors_for_unknown_tag() {
        let tracker: CompletionTracker<String, Vec<Notification>> = CompletionTracker::new(TagSpecs::new(), Vec::new());
        let shared = SharedTracker::from(tracker);
        assert_eq!(shared.count("x"), None);
        assert_eq!(shared.things("x"), None);
        assert_eq!(shared.posted_to("x"), None);
        assert!(shared.spec("x").is_none());
        assert!(shared.tags().is_empty());
    }
}
