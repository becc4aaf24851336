//! Three-state descriptor field

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A descriptor field that can be left out, explicitly cleared, or set.
///
/// `Omitted` is skipped on serialization. `Cleared` serializes as `null` and
/// tells the executor to drop any value it would otherwise apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Omitted,
    Cleared,
    Value(T),
}

impl<T> Slot<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Slot::Omitted)
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, Slot::Cleared)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Omitted
    }
}

impl<T> From<Option<T>> for Slot<T> {
    /// `None` maps to `Omitted`
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Slot::Value(v),
            None => Slot::Omitted,
        }
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Value(v) => v.serialize(serializer),
            Slot::Omitted | Slot::Cleared => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    /// A present `null` reads back as `Cleared`; a missing field falls back to
    /// `Default` (`Omitted`) through `#[serde(default)]`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Slot::Value(v),
            None => Slot::Cleared,
        })
    }
}
