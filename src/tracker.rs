//! The completion tracker.
//!
//! A [`CompletionTracker`] is configured with a fixed set of tags, accepts
//! posts to them, and publishes a single `complete` notification the first
//! time every tag's policy is satisfied while the tracker is armed.
//!
//! ```
//! use completion_tracker::{CompletionTracker, Notification, TagSpec, TagSpecs};
//!
//! let specs = TagSpecs::new()
//!     .with(TagSpec::hold("config"))
//!     .with(TagSpec::count("worker", 2));
//! let mut tracker: CompletionTracker<String, Vec<Notification>> =
//!     CompletionTracker::new(specs, Vec::new());
//!
//! tracker.post("config", "loaded".to_string()).unwrap();
//! tracker.post("worker", "w1".to_string()).unwrap();
//! assert!(!tracker.is_complete());
//! tracker.post("worker", "w2".to_string()).unwrap();
//! assert!(tracker.is_complete());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::TrackerResult;
use crate::measure::{Measure, SizeDescriptor};
use crate::notify::{Notification, NotificationPayload, NotificationSink, NullSink, COMPLETE_MESSAGE};
use crate::spec::{normalize, RawTagSpecs, TagSpec, TagSpecs, TrackType};
use crate::state::TagTrackingState;

/// Result of a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The post was applied to a declared tag.
    Accepted {
        tag: String,
        /// The tag's counter after the post.
        count: u64,
        /// True if this post completed the tracker.
        completed: bool,
    },
    /// The tag is not declared; nothing was recorded.
    InvalidTag { tag: String },
}

impl PostOutcome {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    #[must_use]
    pub const fn completed(&self) -> bool {
        matches!(self, Self::Accepted { completed: true, .. })
    }
}

/// Point-in-time view of one tag.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub tag: String,
    pub track_type: TrackType,
    pub required: u64,
    pub count: u64,
    pub values: usize,
    pub satisfied: bool,
}

/// Point-in-time view of a tracker, in configuration order.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub armed: bool,
    pub complete: bool,
    pub tags: Vec<TagSnapshot>,
}

/// Labeled-completion barrier.
///
/// `T` is the type of posted values and `S` the sink notifications are
/// published to. All mutation goes through [`post`](Self::post),
/// [`arm`](Self::arm), [`disarm`](Self::disarm) and
/// [`configure`](Self::configure). For use from several threads see
/// [`SharedTracker`](crate::SharedTracker).
pub struct CompletionTracker<T, S = NullSink> {
    specs: TagSpecs,
    states: HashMap<String, TagTrackingState<T>>,
    armed: bool,
    complete: bool,
    sink: S,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<T, S: NotificationSink> CompletionTracker<T, S> {
    /// Creates an armed tracker with `tracing` diagnostics.
    #[must_use]
    pub fn new(specs: TagSpecs, sink: S) -> Self {
        TrackerBuilder::new().tag_specs(specs).build(sink)
    }

    fn from_parts(specs: TagSpecs, armed: bool, sink: S, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let states = fresh_states(&specs);
        Self {
            specs,
            states,
            armed,
            complete: false,
            sink,
            diagnostics,
        }
    }

    /// Replaces the tag specification with a normalized `raw` one.
    ///
    /// See [`configure_specs`](Self::configure_specs).
    pub fn configure(&mut self, raw: &RawTagSpecs, start_tracking: bool) {
        let specs = normalize(raw, self.diagnostics.as_ref());
        self.configure_specs(specs, start_tracking);
    }

    /// Replaces the tag specification.
    ///
    /// Every tag starts over with empty state and `armed` is set to
    /// `start_tracking`. Completion is sticky and is not reset; satisfaction
    /// is not evaluated here.
    pub fn configure_specs(&mut self, specs: TagSpecs, start_tracking: bool) {
        tracing::debug!(tags = specs.len(), start_tracking, "configuring completion tracker");
        self.states = fresh_states(&specs);
        self.specs = specs;
        self.armed = start_tracking;
    }

    /// Posts `value` to `tag` under the tag's configured policy.
    pub fn post(&mut self, tag: &str, value: T) -> TrackerResult<PostOutcome>
    where
        T: Measure,
    {
        self.post_as(tag, value, None)
    }

    /// Posts `value` to `tag`, applying `override_type` instead of the
    /// configured policy when one is given.
    ///
    /// Posting to an undeclared tag records nothing and publishes an
    /// `invalid_tag` notification. Otherwise the post is recorded, a `post`
    /// notification is published, and if the tracker is armed satisfaction is
    /// evaluated. Posting after completion keeps updating state.
    ///
    /// The only error is a sink failure, which is returned as soon as it
    /// happens.
    pub fn post_as(&mut self, tag: &str, value: T, override_type: Option<TrackType>) -> TrackerResult<PostOutcome>
    where
        T: Measure,
    {
        let size = SizeDescriptor::of(&value);

        let (Some(spec), Some(state)) = (self.specs.get(tag), self.states.get_mut(tag)) else {
            tracing::debug!(tag, "post to undeclared tag");
            self.sink.publish(&Notification::new(NotificationPayload::InvalidTag {
                tag: tag.to_string(),
                message: format!("({size}) {tag}"),
            }))?;
            return Ok(PostOutcome::InvalidTag { tag: tag.to_string() });
        };

        let track_type = override_type.unwrap_or(spec.track_type());
        state.record(track_type, value);

        let count = state.count();
        let message = match track_type {
            TrackType::Hold => format!("Held post to {tag} ({size})"),
            TrackType::Count => format!("Counted [{count}] post(s) to {tag} ({size})"),
            TrackType::Collect => format!("Collected [{count}] post(s) to {tag} ({size})"),
        };
        let payload = NotificationPayload::Post {
            tag: tag.to_string(),
            message,
            track_type,
            count,
            holding: state.held().is_some(),
        };
        self.sink.publish(&Notification::new(payload))?;

        let completed = self.armed && self.is_satisfied() && self.set_complete()?;

        Ok(PostOutcome::Accepted {
            tag: tag.to_string(),
            count,
            completed,
        })
    }

    /// Enables tracking and immediately evaluates satisfaction against the
    /// state accumulated so far. Returns whether the tracker is complete.
    pub fn arm(&mut self) -> TrackerResult<bool> {
        tracing::debug!("arming completion tracker");
        self.armed = true;
        if self.is_satisfied() {
            self.set_complete()?;
        }
        Ok(self.complete)
    }

    /// Suspends satisfaction evaluation. Posts still accumulate.
    pub fn disarm(&mut self) {
        tracing::debug!("disarming completion tracker");
        self.armed = false;
    }

    /// Marks the tracker complete and publishes the `complete` notification.
    /// Returns false without publishing if it was already complete.
    fn set_complete(&mut self) -> TrackerResult<bool> {
        if self.complete {
            return Ok(false);
        }
        self.complete = true;
        tracing::debug!(tags = self.specs.len(), "completion tracker complete");
        self.sink.publish(&Notification::new(NotificationPayload::Complete {
            message: COMPLETE_MESSAGE.to_string(),
        }))?;
        Ok(true)
    }
}

impl<T, S> CompletionTracker<T, S> {
    /// True when armed and every declared tag's policy is satisfied.
    /// Always false while disarmed.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        if !self.armed {
            return false;
        }
        self.specs.iter().all(|spec| {
            self.diagnostics.checking(spec.tag(), spec.track_type());
            self.states
                .get(spec.tag())
                .is_some_and(|state| state.satisfies(spec))
        })
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// What has been posted to `tag`.
    ///
    /// For a Hold tag this is a single element: the held value, or `None`
    /// before the first post. For Count/Collect tags it is the recorded
    /// sequence (always empty for Count). `None` for undeclared tags.
    #[must_use]
    pub fn posted_to(&self, tag: &str) -> Option<Vec<Option<&T>>> {
        let spec = self.specs.get(tag)?;
        let state = self.states.get(tag)?;
        Some(match spec.track_type() {
            TrackType::Hold => vec![state.held()],
            TrackType::Count | TrackType::Collect => state.values().iter().map(Some).collect(),
        })
    }

    /// Alias of [`posted_to`](Self::posted_to).
    #[must_use]
    pub fn thing(&self, tag: &str) -> Option<Vec<Option<&T>>> {
        self.posted_to(tag)
    }

    /// Raw recorded values for `tag`, regardless of policy.
    #[must_use]
    pub fn things(&self, tag: &str) -> Option<&[T]> {
        self.states.get(tag).map(TagTrackingState::values)
    }

    /// The tag's counter; 0 if never posted.
    #[must_use]
    pub fn count(&self, tag: &str) -> Option<u64> {
        self.states.get(tag).map(TagTrackingState::count)
    }

    /// Declared tag names in configuration order.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.specs.tags().collect()
    }

    #[must_use]
    pub fn spec(&self, tag: &str) -> Option<&TagSpec> {
        self.specs.get(tag)
    }

    #[must_use]
    pub const fn specs(&self) -> &TagSpecs {
        &self.specs
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Captures flags and per-tag progress.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        let tags = self
            .specs
            .iter()
            .map(|spec| {
                let state = self.states.get(spec.tag());
                TagSnapshot {
                    tag: spec.tag().to_string(),
                    track_type: spec.track_type(),
                    required: spec.required(),
                    count: state.map_or(0, TagTrackingState::count),
                    values: state.map_or(0, |s| s.values().len()),
                    satisfied: state.is_some_and(|s| s.satisfies(spec)),
                }
            })
            .collect();
        TrackerSnapshot {
            armed: self.armed,
            complete: self.complete,
            tags,
        }
    }
}

impl<T, S: fmt::Debug> fmt::Debug for CompletionTracker<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("specs", &self.specs)
            .field("armed", &self.armed)
            .field("complete", &self.complete)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

fn fresh_states<T>(specs: &TagSpecs) -> HashMap<String, TagTrackingState<T>> {
    specs
        .tags()
        .map(|tag| (tag.to_string(), TagTrackingState::new()))
        .collect()
}

#[derive(Debug, Clone)]
enum SpecSource {
    Typed(TagSpecs),
    Raw(RawTagSpecs),
}

/// Builder for [`CompletionTracker`].
#[must_use]
pub struct TrackerBuilder {
    source: SpecSource,
    start_tracking: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl TrackerBuilder {
    /// No tags, armed, `tracing` diagnostics.
    pub fn new() -> Self {
        Self {
            source: SpecSource::Typed(TagSpecs::new()),
            start_tracking: true,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Seeds a builder from a loaded configuration.
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new()
            .raw_tag_specs(config.raw_tag_specs())
            .start_tracking(config.start_tracking)
    }

    pub fn tag_specs(mut self, specs: TagSpecs) -> Self {
        self.source = SpecSource::Typed(specs);
        self
    }

    /// Uses a raw specification, normalized at build time.
    pub fn raw_tag_specs(mut self, raw: impl Into<RawTagSpecs>) -> Self {
        self.source = SpecSource::Raw(raw.into());
        self
    }

    /// `false` builds a disarmed tracker.
    pub fn start_tracking(mut self, start_tracking: bool) -> Self {
        self.start_tracking = start_tracking;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Builds the tracker, publishing to `sink`.
    pub fn build<T, S: NotificationSink>(self, sink: S) -> CompletionTracker<T, S> {
        let specs = match self.source {
            SpecSource::Typed(specs) => specs,
            SpecSource::Raw(raw) => normalize(&raw, self.diagnostics.as_ref()),
        };
        CompletionTracker::from_parts(specs, self.start_tracking, sink, self.diagnostics)
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("source", &self.source)
            .field("start_tracking", &self.start_tracking)
            .finish_non_exhaustive()
    }
}
