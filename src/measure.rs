//! Size descriptors for posted values.
//!
//! Notification messages include the length of the posted value, e.g.
//! `Held post to a (12)`. Values without a meaningful length render as `-`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A value whose size can be described in a notification message.
pub trait Measure {
    /// Length of the value, or `None` when length is not meaningful.
    fn measure(&self) -> Option<usize>;
}

impl Measure for str {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Measure for String {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Measure for Cow<'_, str> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Measure for [T] {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Measure for Vec<T> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> Measure for VecDeque<T> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<K, V, S> Measure for HashMap<K, V, S> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<K, V> Measure for BTreeMap<K, V> {
    fn measure(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T: Measure + ?Sized> Measure for &T {
    fn measure(&self) -> Option<usize> {
        (**self).measure()
    }
}

impl<T: Measure + ?Sized> Measure for Box<T> {
    fn measure(&self) -> Option<usize> {
        (**self).measure()
    }
}

impl<T: Measure + ?Sized> Measure for Arc<T> {
    fn measure(&self) -> Option<usize> {
        (**self).measure()
    }
}

impl<T: Measure> Measure for Option<T> {
    fn measure(&self) -> Option<usize> {
        self.as_ref().and_then(Measure::measure)
    }
}

/// Strings, arrays and objects have a length; other JSON values do not.
impl Measure for serde_json::Value {
    fn measure(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.len()),
            Self::Array(items) => Some(items.len()),
            Self::Object(map) => Some(map.len()),
            Self::Null | Self::Bool(_) | Self::Number(_) => None,
        }
    }
}

macro_rules! unmeasured {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Measure for $ty {
                fn measure(&self) -> Option<usize> {
                    None
                }
            }
        )*
    };
}

unmeasured!(bool, char, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, ());

/// Renders a size descriptor the way notification messages show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeDescriptor(pub Option<usize>);

impl SizeDescriptor {
    /// Describes `value`.
    #[must_use]
    pub fn of<T: Measure + ?Sized>(value: &T) -> Self {
        Self(value.measure())
    }
}

impl fmt::Display for SizeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(len) => write!(f, "{len}"),
            None => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_string_and_collections_have_length() {
        assert_eq!("abc".measure(), Some(3));
        assert_eq!(String::from("hello").measure(), Some(5));
        assert_eq!(vec![1, 2].measure(), Some(2));
        assert_eq!(Some(String::from("xy")).measure(), Some(2));
        assert_eq!(None::<String>.measure(), None);
    }

    #[test]
    fn test_scalars_have_no_length() {
        assert_eq!(7u32.measure(), None);
        assert_eq!(true.measure(), None);
        assert_eq!(1.5f64.measure(), None);
    }

    #[test]
    fn test_json_value_length() {
        assert_eq!(json!("abcd").measure(), Some(4));
        assert_eq!(json!([1, 2, 3]).measure(), Some(3));
        assert_eq!(json!({"k": 1}).measure(), Some(1));
        assert_eq!(json!(12).measure(), None);
        assert_eq!(json!(null).measure(), None);
    }

    #[test]
    fn test_size_descriptor_display() {
        assert_eq!(SizeDescriptor::of("This is A number 0").to_string(), "18");
        assert_eq!(SizeDescriptor::of(&5u8).to_string(), "-");
    }
}
