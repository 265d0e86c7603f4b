//! # completion-tracker - a labeled-completion barrier
//!
//! Declare a fixed set of named tags, each with a tracking policy, then post
//! contributions to them as they arrive. The tracker publishes one
//! `complete` notification the first time every tag's policy is satisfied.
//!
//! ## Core Concepts
//!
//! - **Tag**: a declared name identifying one expected contribution
//! - **Track type**: `Hold` keeps the latest value, `Count` tallies posts,
//!   `Collect` tallies and keeps every value
//! - **Armed**: satisfaction is only evaluated while armed; posts made while
//!   disarmed are kept and evaluated on [`CompletionTracker::arm`]
//! - **Completion**: sticky; published at most once per tracker
//!
//! ## Usage
//!
//! ```rust
//! use completion_tracker::{
//!     CompletionTracker, NotificationKind, Subscribers, TrackerBuilder,
//! };
//! use serde_json::json;
//!
//! let mut subscribers = Subscribers::new();
//! subscribers.on(NotificationKind::Complete, |n| {
//!     println!("{}", n.message());
//!     Ok(())
//! });
//!
//! let mut tracker: CompletionTracker<String, Subscribers> = TrackerBuilder::new()
//!     .raw_tag_specs(json!({
//!         "a": {"trackType": "hold"},
//!         "b": {"trackType": "count", "opts": {"reqd": 2}},
//!     }))
//!     .build(subscribers);
//!
//! tracker.post("a", "ready".to_string())?;
//! tracker.post("b", "one".to_string())?;
//! tracker.post("b", "two".to_string())?;
//! assert!(tracker.is_complete());
//! # Ok::<(), completion_tracker::TrackerError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod measure;
pub mod notify;
pub mod shared;
pub mod spec;
pub mod state;
pub mod tracker;

// Re-export primary types at crate root for convenience
pub use config::TrackerConfig;
pub use diagnostics::{Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use error::{ConfigError, SinkError, TrackerError, TrackerResult};
pub use measure::Measure;
pub use notify::{
    ChannelSink, Notification, NotificationKind, NotificationPayload, NotificationSink, NotificationStream,
    NullSink, Subscribers, SubscriptionId,
};
pub use shared::SharedTracker;
pub use spec::{RawTagSpecs, SpecWarning, TagSpec, TagSpecs, TrackType};
pub use state::TagTrackingState;
pub use tracker::{CompletionTracker, PostOutcome, TagSnapshot, TrackerBuilder, TrackerSnapshot};
