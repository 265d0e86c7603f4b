//! Per-tag tracking state.

use serde::Serialize;

use crate::spec::{TagSpec, TrackType};

/// Mutable record of what has been posted to one tag.
///
/// Under a tag's own policy the record keeps these shapes:
/// - Hold: at most one value, replaced by every post; `count` stays 0.
/// - Count: no values; `count` grows by one per post.
/// - Collect: every value appended in post order; `count == values.len()`.
///
/// `count` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagTrackingState<T> {
    values: Vec<T>,
    count: u64,
}

impl<T> Default for TagTrackingState<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            count: 0,
        }
    }
}

impl<T> TagTrackingState<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one post under `track_type`.
    pub fn record(&mut self, track_type: TrackType, value: T) {
        match track_type {
            TrackType::Hold => match self.values.first_mut() {
                Some(slot) => *slot = value,
                None => self.values.push(value),
            },
            TrackType::Count => {
                self.count += 1;
            }
            TrackType::Collect => {
                self.count += 1;
                self.values.push(value);
            }
        }
    }

    /// Evaluates `spec`'s policy predicate against this record.
    #[must_use]
    pub fn satisfies(&self, spec: &TagSpec) -> bool {
        match spec.track_type() {
            TrackType::Hold => !self.values.is_empty(),
            TrackType::Count | TrackType::Collect => self.count >= spec.required(),
        }
    }

    /// Recorded values in post order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The held value, if any.
    #[must_use]
    pub fn held(&self) -> Option<&T> {
        self.values.first()
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_replaces_sole_value() {
        let mut state = TagTrackingState::new();
        state.record(TrackType::Hold, "x");
        state.record(TrackType::Hold, "y");
        assert_eq!(state.values(), &["y"]);
        assert_eq!(state.held(), Some(&"y"));
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn test_count_keeps_no_values() {
        let mut state = TagTrackingState::new();
        for i in 0..4 {
            state.record(TrackType::Count, i);
        }
        assert!(state.values().is_empty());
        assert_eq!(state.count(), 4);
    }

    #[test]
    fn test_collect_appends_in_order() {
        let mut state = TagTrackingState::new();
        for i in 0..3 {
            state.record(TrackType::Collect, i);
        }
        assert_eq!(state.values(), &[0, 1, 2]);
        assert_eq!(state.count(), 3);
    }

    #[test]
    fn test_hold_satisfied_after_one_post() {
        let spec = TagSpec::hold("a");
        let mut state = TagTrackingState::new();
        assert!(!state.satisfies(&spec));
        state.record(TrackType::Hold, 1);
        assert!(state.satisfies(&spec));
    }

    #[test]
    fn test_counted_satisfied_at_required() {
        let count = TagSpec::count("b", 3);
        let collect = TagSpec::collect("c", 3);
        let mut b = TagTrackingState::new();
        let mut c = TagTrackingState::new();
        for _ in 0..2 {
            b.record(TrackType::Count, ());
            c.record(TrackType::Collect, ());
        }
        assert!(!b.satisfies(&count));
        assert!(!c.satisfies(&collect));
        b.record(TrackType::Count, ());
        c.record(TrackType::Collect, ());
        assert!(b.satisfies(&count));
        assert!(c.satisfies(&collect));
    }

    #[test]
    fn test_override_count_on_hold_tag_does_not_satisfy_hold() {
        let spec = TagSpec::hold("a");
        let mut state = TagTrackingState::new();
        state.record(TrackType::Count, 1);
        assert_eq!(state.count(), 1);
        assert!(!state.satisfies(&spec));
    }
}
