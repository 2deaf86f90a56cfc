//! Shared modeled types.

use serde::{Deserialize, Serialize};

/// A union member this client version does not know about.
///
/// Generated unions carry an `Unknown(UnknownVariant)` variant so that
/// responses containing newer members still parse.
///
/// # Example
///
/// ```
/// use pylon_core::types::UnknownVariant;
///
/// enum Shape {
///     Circle(f64),
///     Unknown(UnknownVariant),
/// }
///
/// let shape = Shape::Unknown(UnknownVariant::new("hexagon", serde_json::json!({ "side": 2 })));
/// if let Shape::Unknown(unknown) = shape {
///     assert_eq!(unknown.name, "hexagon");
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownVariant {
    /// Wire name of the member.
    pub name: String,
    /// Raw member value.
    pub value: serde_json::Value,
}

impl UnknownVariant {
    /// Creates an unknown variant.
    #[must_use]
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Splits a single-member JSON object into an unknown variant.
    ///
    /// Returns `None` unless `object` has exactly one member.
    #[must_use]
    pub fn from_object(object: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        if object.len() != 1 {
            return None;
        }
        let (name, value) = object.iter().next()?;
        Some(Self::new(name.clone(), value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_object() {
        let value = json!({ "triangle": { "sides": 3 } });
        let unknown = UnknownVariant::from_object(value.as_object().unwrap()).unwrap();
        assert_eq!(unknown.name, "triangle");
        assert_eq!(unknown.value, json!({ "sides": 3 }));

        let two = json!({ "a": 1, "b": 2 });
        assert!(UnknownVariant::from_object(two.as_object().unwrap()).is_none());
    }
}
