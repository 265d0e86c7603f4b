//! Normalization of loosely-shaped tag specifications.
//!
//! A raw specification is classified once into a [`RawTagSpecs`] variant and
//! each variant has its own normalizer. Every normalizer produces the same
//! canonical [`TagSpec`] records. Bad per-tag metadata never fails
//! normalization: it is reported through [`Diagnostics`] and replaced with a
//! safe default, or the entry is skipped.
//!
//! Accepted shapes (JSON):
//!
//! ```json
//! ["a", {"tag": "b", "trackType": "count", "opts": {"reqd": 5}}]
//! {"a": {"trackType": "hold"}, "c": {"trackType": "coll", "opts": {"reqd": 7}}}
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use crate::diagnostics::Diagnostics;

use super::{TagSpec, TagSpecs, TrackType};

/// Field naming the tag inside a descriptor object.
const TAG_FIELD: &str = "tag";
/// Field naming the policy inside a descriptor object.
const TRACK_TYPE_FIELD: &str = "trackType";
/// Field holding policy options inside a descriptor object.
const OPTS_FIELD: &str = "opts";
/// Option holding the required post count.
const REQD_FIELD: &str = "reqd";

/// A raw tag specification, classified by shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawTagSpecs {
    /// No tags declared.
    #[default]
    Absent,
    /// Ordered sequence of tag names or descriptor objects.
    List(Vec<Value>),
    /// Mapping from tag name to descriptor.
    Map(Map<String, Value>),
    /// Anything else; normalizes to no tags.
    Unrecognized(Value),
}

impl RawTagSpecs {
    /// Classifies a JSON value by shape.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Array(items) => Self::List(items),
            Value::Object(map) => Self::Map(map),
            other => Self::Unrecognized(other),
        }
    }
}

impl From<Value> for RawTagSpecs {
    fn from(value: Value) -> Self {
        Self::classify(value)
    }
}

impl From<Option<Value>> for RawTagSpecs {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Absent, Self::classify)
    }
}

/// Non-fatal problems found while normalizing a raw specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecWarning {
    #[error("Tag/tag property conflict for tag {key} (tag property {found}); using {key}")]
    TagConflict { key: String, found: String },

    #[error("Unsupported track type {found} for tag {tag}; assuming \"hold\"")]
    UnsupportedTrackType { tag: String, found: String },

    #[error("Invalid tag: {found}")]
    InvalidTag { found: String },

    #[error("Invalid tag spec {found}: should be a string or an object")]
    InvalidElement { found: String },

    #[error("Property {key} of tag spec object is not a string or an object: {found}")]
    InvalidProperty { key: String, found: String },

    #[error("Tag specs must be absent, a list or a mapping, got {found}")]
    UnrecognizedShape { found: String },
}

impl SpecWarning {
    /// Tag the warning refers to, when there is one.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::TagConflict { key, .. } | Self::InvalidProperty { key, .. } => Some(key),
            Self::UnsupportedTrackType { tag, .. } => Some(tag),
            Self::InvalidTag { .. } | Self::InvalidElement { .. } | Self::UnrecognizedShape { .. } => None,
        }
    }
}

/// Normalizes a raw specification into canonical tag specs.
///
/// Duplicate tag names overwrite earlier entries; the tag keeps the position
/// of its first appearance.
pub fn normalize(raw: &RawTagSpecs, diagnostics: &dyn Diagnostics) -> TagSpecs {
    match raw {
        RawTagSpecs::Absent => TagSpecs::new(),
        RawTagSpecs::List(items) => normalize_list(items, diagnostics),
        RawTagSpecs::Map(map) => normalize_map(map, diagnostics),
        RawTagSpecs::Unrecognized(value) => {
            diagnostics.warn(&SpecWarning::UnrecognizedShape {
                found: value.to_string(),
            });
            TagSpecs::new()
        }
    }
}

fn normalize_list(items: &[Value], diagnostics: &dyn Diagnostics) -> TagSpecs {
    let mut specs = TagSpecs::new();
    for item in items {
        match item {
            Value::String(name) => {
                specs.push(TagSpec::hold(name.as_str()));
            }
            Value::Object(descriptor) => match descriptor.get(TAG_FIELD) {
                Some(Value::String(name)) => {
                    specs.push(normalize_descriptor(name, descriptor, diagnostics));
                }
                other => diagnostics.warn(&SpecWarning::InvalidTag {
                    found: other.map_or_else(|| "undefined".to_string(), Value::to_string),
                }),
            },
            other => diagnostics.warn(&SpecWarning::InvalidElement {
                found: other.to_string(),
            }),
        }
    }
    specs
}

fn normalize_map(map: &Map<String, Value>, diagnostics: &dyn Diagnostics) -> TagSpecs {
    let mut specs = TagSpecs::new();
    for (key, value) in map {
        match value {
            Value::Object(descriptor) => {
                specs.push(normalize_descriptor(key, descriptor, diagnostics));
            }
            Value::String(name) => {
                if name != key {
                    diagnostics.warn(&SpecWarning::TagConflict {
                        key: key.clone(),
                        found: value.to_string(),
                    });
                }
                specs.push(TagSpec::hold(key.as_str()));
            }
            other => diagnostics.warn(&SpecWarning::InvalidProperty {
                key: key.clone(),
                found: other.to_string(),
            }),
        }
    }
    specs
}

/// Normalizes a descriptor object stored under `key`. The key always wins
/// over a conflicting `tag` field.
fn normalize_descriptor(key: &str, descriptor: &Map<String, Value>, diagnostics: &dyn Diagnostics) -> TagSpec {
    if let Some(tag_prop) = descriptor.get(TAG_FIELD) {
        if tag_prop.as_str() != Some(key) {
            diagnostics.warn(&SpecWarning::TagConflict {
                key: key.to_string(),
                found: tag_prop.to_string(),
            });
        }
    }

    let track_type = match descriptor.get(TRACK_TYPE_FIELD) {
        Some(Value::String(name)) => TrackType::parse(name),
        _ => None,
    };
    let track_type = track_type.unwrap_or_else(|| {
        diagnostics.warn(&SpecWarning::UnsupportedTrackType {
            tag: key.to_string(),
            found: descriptor
                .get(TRACK_TYPE_FIELD)
                .map_or_else(|| "undefined".to_string(), Value::to_string),
        });
        TrackType::Hold
    });

    let required = if track_type.is_counted() {
        descriptor
            .get(OPTS_FIELD)
            .and_then(Value::as_object)
            .and_then(|opts| opts.get(REQD_FIELD))
            .map_or(1, required_from_value)
    } else {
        1
    };

    TagSpec::with_type(key, track_type, required)
}

/// Only numbers strictly greater than one are accepted; fractional values are
/// rounded up since satisfaction compares a whole post count against them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn required_from_value(value: &Value) -> u64 {
    if let Some(n) = value.as_u64() {
        return super::accept_required(n);
    }
    match value.as_f64() {
        Some(f) if f > 1.0 => {
            if f >= u64::MAX as f64 {
                u64::MAX
            } else {
                f.ceil() as u64
            }
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::diagnostics::RecordingDiagnostics;

    fn run(value: Value) -> (TagSpecs, Vec<SpecWarning>) {
        let diag = RecordingDiagnostics::new();
        let specs = normalize(&RawTagSpecs::classify(value), &diag);
        (specs, diag.warnings())
    }

    #[test]
    fn test_classify_shapes() {
        assert_eq!(RawTagSpecs::classify(Value::Null), RawTagSpecs::Absent);
        assert!(matches!(RawTagSpecs::classify(json!(["a"])), RawTagSpecs::List(_)));
        assert!(matches!(RawTagSpecs::classify(json!({"a": {}})), RawTagSpecs::Map(_)));
        assert!(matches!(RawTagSpecs::classify(json!(3)), RawTagSpecs::Unrecognized(_)));
        assert_eq!(RawTagSpecs::from(None), RawTagSpecs::Absent);
    }

    #[test]
    fn test_bare_names_are_hold() {
        let (specs, warnings) = run(json!(["a", "b"]));
        assert!(warnings.is_empty());
        assert_eq!(specs.get("a"), Some(&TagSpec::hold("a")));
        assert_eq!(specs.get("b"), Some(&TagSpec::hold("b")));
    }

    #[test]
    fn test_list_descriptor_without_tag_is_skipped() {
        let (specs, warnings) = run(json!([{"trackType": "count"}, "a"]));
        assert_eq!(specs.tags().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(
            warnings,
            vec![SpecWarning::InvalidTag {
                found: "undefined".to_string()
            }]
        );
    }

    #[test]
    fn test_list_non_string_non_object_is_skipped() {
        let (specs, warnings) = run(json!([1, null, ["x"], "a"]));
        assert_eq!(specs.len(), 1);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| matches!(w, SpecWarning::InvalidElement { .. })));
    }

    #[test]
    fn test_map_key_wins_over_tag_property() {
        let (specs, warnings) = run(json!({"a": {"tag": "z", "trackType": "hold"}}));
        assert_eq!(specs.get("a").unwrap().tag(), "a");
        assert!(specs.get("z").is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tag(), Some("a"));
    }

    #[test]
    fn test_matching_tag_property_is_silent() {
        let (_, warnings) = run(json!({"a": {"tag": "a", "trackType": "hold"}}));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_or_missing_track_type_falls_back_to_hold() {
        let (specs, warnings) = run(json!({
            "a": {"trackType": "tally", "opts": {"reqd": 4}},
            "b": {},
            "c": {"trackType": 7}
        }));
        for tag in ["a", "b", "c"] {
            let spec = specs.get(tag).unwrap();
            assert_eq!(spec.track_type(), TrackType::Hold);
            assert_eq!(spec.required(), 1);
        }
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| matches!(w, SpecWarning::UnsupportedTrackType { .. })));
    }

    #[test]
    fn test_reqd_must_be_greater_than_one() {
        let (specs, _) = run(json!({
            "absent": {"trackType": "count"},
            "zero": {"trackType": "count", "opts": {"reqd": 0}},
            "one": {"trackType": "count", "opts": {"reqd": 1}},
            "neg": {"trackType": "coll", "opts": {"reqd": -3}},
            "text": {"trackType": "coll", "opts": {"reqd": "5"}},
            "five": {"trackType": "count", "opts": {"reqd": 5}},
            "frac": {"trackType": "coll", "opts": {"reqd": 2.5}},
            "bad_opts": {"trackType": "count", "opts": 9}
        }));
        let reqd = |t: &str| specs.get(t).unwrap().required();
        assert_eq!(reqd("absent"), 1);
        assert_eq!(reqd("zero"), 1);
        assert_eq!(reqd("one"), 1);
        assert_eq!(reqd("neg"), 1);
        assert_eq!(reqd("text"), 1);
        assert_eq!(reqd("five"), 5);
        assert_eq!(reqd("frac"), 3);
        assert_eq!(reqd("bad_opts"), 1);
    }

    #[test]
    fn test_reqd_ignored_for_hold() {
        let (specs, _) = run(json!({"a": {"trackType": "hold", "opts": {"reqd": 9}}}));
        assert_eq!(specs.get("a").unwrap().required(), 1);
    }

    #[test]
    fn test_map_string_value_is_hold_under_key() {
        let (specs, warnings) = run(json!({"a": "a", "b": "other"}));
        assert_eq!(specs.get("a"), Some(&TagSpec::hold("a")));
        assert_eq!(specs.get("b"), Some(&TagSpec::hold("b")));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_map_invalid_property_is_skipped() {
        let (specs, warnings) = run(json!({"a": 3, "b": {"trackType": "count"}}));
        assert_eq!(specs.tags().collect::<Vec<_>>(), vec!["b"]);
        assert!(matches!(&warnings[0], SpecWarning::InvalidProperty { key, .. } if key == "a"));
    }

    #[test]
    fn test_duplicates_last_wins() {
        let (specs, _) = run(json!([
            "a",
            "b",
            {"tag": "a", "trackType": "count", "opts": {"reqd": 3}}
        ]));
        assert_eq!(specs.tags().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(specs.get("a"), Some(&TagSpec::count("a", 3)));
    }

    #[test]
    fn test_unrecognized_top_level_shape() {
        let (specs, warnings) = run(json!("a"));
        assert!(specs.is_empty());
        assert!(matches!(&warnings[0], SpecWarning::UnrecognizedShape { .. }));
    }
}
