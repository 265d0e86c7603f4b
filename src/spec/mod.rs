//! Tag specifications.
//!
//! A `TagSpec` names one expected contribution and the policy that decides
//! when it is satisfied. `TagSpecs` is the ordered, name-keyed collection a
//! tracker is configured with; it can be built directly or produced from a
//! loosely-shaped description by [`normalize`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod normalize;

pub use normalize::{normalize, RawTagSpecs, SpecWarning};

/// Tracking policy for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    /// Keep only the most recently posted value.
    Hold,
    /// Tally posts, discard values.
    Count,
    /// Tally posts and keep every value in post order.
    Collect,
}

impl TrackType {
    /// Parses a policy name, returning `None` for anything unrecognized.
    ///
    /// Accepts `hold`, `count`, `coll` and `collect`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hold" => Some(Self::Hold),
            "count" => Some(Self::Count),
            "coll" | "collect" => Some(Self::Collect),
            _ => None,
        }
    }

    /// Returns the canonical policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Count => "count",
            Self::Collect => "collect",
        }
    }

    /// Returns true if the policy uses a `required` threshold.
    #[must_use]
    pub const fn is_counted(&self) -> bool {
        matches!(self, Self::Count | Self::Collect)
    }
}

impl Default for TrackType {
    fn default() -> Self {
        Self::Hold
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by `TrackType::from_str`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported track type: {0}")]
pub struct ParseTrackTypeError(pub String);

impl FromStr for TrackType {
    type Err = ParseTrackTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseTrackTypeError(s.to_string()))
    }
}

/// Applies the `required` acceptance rule: values strictly greater than one
/// are kept, everything else becomes one.
#[must_use]
pub const fn accept_required(reqd: u64) -> u64 {
    if reqd > 1 {
        reqd
    } else {
        1
    }
}

/// Canonical, immutable specification for one tag.
///
/// Deserialized specs pass through the same acceptance rule as the
/// constructors, so `required` is never below 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TagSpecFields")]
pub struct TagSpec {
    tag: String,
    track_type: TrackType,
    required: u64,
}

#[derive(Deserialize)]
struct TagSpecFields {
    tag: String,
    #[serde(default)]
    track_type: TrackType,
    #[serde(default)]
    required: u64,
}

impl From<TagSpecFields> for TagSpec {
    fn from(fields: TagSpecFields) -> Self {
        Self::with_type(fields.tag, fields.track_type, fields.required)
    }
}

impl TagSpec {
    /// A Hold tag: satisfied once any value has been posted.
    #[must_use]
    pub fn hold(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            track_type: TrackType::Hold,
            required: 1,
        }
    }

    /// A Count tag satisfied after `reqd` posts.
    #[must_use]
    pub fn count(tag: impl Into<String>, reqd: u64) -> Self {
        Self::with_type(tag, TrackType::Count, reqd)
    }

    /// A Collect tag satisfied after `reqd` posts.
    #[must_use]
    pub fn collect(tag: impl Into<String>, reqd: u64) -> Self {
        Self::with_type(tag, TrackType::Collect, reqd)
    }

    /// Builds a spec for any policy; `reqd` is ignored for Hold.
    #[must_use]
    pub fn with_type(tag: impl Into<String>, track_type: TrackType, reqd: u64) -> Self {
        let required = if track_type.is_counted() {
            accept_required(reqd)
        } else {
            1
        };
        Self {
            tag: tag.into(),
            track_type,
            required,
        }
    }

    /// Tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tracking policy.
    #[must_use]
    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    /// Posts needed to satisfy a Count/Collect tag. Always 1 for Hold.
    #[must_use]
    pub fn required(&self) -> u64 {
        self.required
    }
}

/// Ordered collection of tag specs keyed by name.
///
/// Iteration follows the position at which a name was first inserted.
/// Re-inserting a name replaces its spec in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSpecs {
    specs: Vec<TagSpec>,
    index: HashMap<String, usize>,
}

impl TagSpecs {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a spec, returning the one it replaced, if any.
    pub fn push(&mut self, spec: TagSpec) -> Option<TagSpec> {
        if let Some(&pos) = self.index.get(&spec.tag) {
            return Some(std::mem::replace(&mut self.specs[pos], spec));
        }
        self.index.insert(spec.tag.clone(), self.specs.len());
        self.specs.push(spec);
        None
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, spec: TagSpec) -> Self {
        self.push(spec);
        self
    }

    /// Looks up a spec by tag name.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TagSpec> {
        self.index.get(tag).map(|&pos| &self.specs[pos])
    }

    /// Returns true if `tag` is declared.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    /// Declared tag names in configuration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.tag.as_str())
    }

    /// Specs in configuration order.
    pub fn iter(&self) -> std::slice::Iter<'_, TagSpec> {
        self.specs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<TagSpec> for TagSpecs {
    fn from_iter<I: IntoIterator<Item = TagSpec>>(iter: I) -> Self {
        let mut specs = Self::new();
        for spec in iter {
            specs.push(spec);
        }
        specs
    }
}

impl<'a> IntoIterator for &'a TagSpecs {
    type Item = &'a TagSpec;
    type IntoIter = std::slice::Iter<'a, TagSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
