//! Helpers for writing [`Validator`](crate::codec::Validator)s.
//!
//! Each helper checks one constraint and returns a [`ValidationError`] whose
//! context is the member path, built with [`member`] and [`index`].
//!
//! # Example
//!
//! ```
//! use pylon_core::validation::{member, validate_length, validate_required};
//! use pylon_core::ValidationError;
//!
//! struct CreateWidget {
//!     name: Option<String>,
//! }
//!
//! fn validate(input: &CreateWidget, context: &str) -> Result<(), ValidationError> {
//!     let name = validate_required(input.name.as_ref(), &member(context, "name"))?;
//!     validate_length(name.len(), Some(1), Some(64), &member(context, "name"))
//! }
//!
//! let err = validate(&CreateWidget { name: None }, "input").unwrap_err();
//! assert_eq!(err.context, "input[:name]");
//! ```

use crate::error::ValidationError;
use std::fmt::Display;

/// Path of a structure member: `input[:name]`.
#[must_use]
pub fn member(context: &str, name: &str) -> String {
    format!("{context}[:{name}]")
}

/// Path of a list element: `input[:tags][2]`.
#[must_use]
pub fn index(context: &str, i: usize) -> String {
    format!("{context}[{i}]")
}

/// Fails if a required member is unset.
pub fn validate_required<'a, T>(
    value: Option<&'a T>,
    context: &str,
) -> Result<&'a T, ValidationError> {
    value.ok_or_else(|| ValidationError::new(context, "expected value to be set"))
}

/// Fails if `value` lies outside `[min, max]`.
pub fn validate_range<T>(
    value: T,
    min: Option<T>,
    max: Option<T>,
    context: &str,
) -> Result<(), ValidationError>
where
    T: PartialOrd + Display + Copy,
{
    if let Some(min) = min {
        if value < min {
            return Err(ValidationError::new(
                context,
                format!("expected {value} to be at least {min}"),
            ));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(ValidationError::new(
                context,
                format!("expected {value} to be at most {max}"),
            ));
        }
    }
    Ok(())
}

/// Fails if a string, list or map length lies outside `[min, max]`.
pub fn validate_length(
    len: usize,
    min: Option<usize>,
    max: Option<usize>,
    context: &str,
) -> Result<(), ValidationError> {
    if min.map_or(true, |min| len >= min) && max.map_or(true, |max| len <= max) {
        return Ok(());
    }
    let bounds = match (min, max) {
        (Some(min), Some(max)) => format!("between {min} and {max}"),
        (Some(min), None) => format!("at least {min}"),
        (_, Some(max)) => format!("at most {max}"),
        (None, None) => String::new(),
    };
    Err(ValidationError::new(
        context,
        format!("expected length {bounds}, got {len}"),
    ))
}

/// Fails if `value` is not one of `allowed`.
pub fn validate_one_of(value: &str, allowed: &[&str], context: &str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            context,
            format!("expected one of {}, got {value:?}", allowed.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let tags = member("input", "tags");
        assert_eq!(index(&tags, 2), "input[:tags][2]");
    }

    #[test]
    fn test_required() {
        assert_eq!(validate_required(Some(&5), "input[:n]").unwrap(), &5);
        let err = validate_required::<u32>(None, "input[:n]").unwrap_err();
        assert_eq!(err.context, "input[:n]");
    }

    #[test]
    fn test_range() {
        assert!(validate_range(5, Some(1), Some(10), "input").is_ok());
        let err = validate_range(0, Some(1), None, "input[:count]").unwrap_err();
        assert_eq!(err.message, "expected 0 to be at least 1");
        assert!(validate_range(11.5, None, Some(10.0), "input").is_err());
    }

    #[test]
    fn test_length() {
        assert!(validate_length(3, Some(1), Some(5), "input").is_ok());
        let err = validate_length(0, Some(1), Some(5), "input[:name]").unwrap_err();
        assert_eq!(err.message, "expected length between 1 and 5, got 0");
    }

    #[test]
    fn test_one_of() {
        assert!(validate_one_of("small", &["small", "large"], "input").is_ok());
        let err = validate_one_of("huge", &["small", "large"], "input[:size]").unwrap_err();
        assert_eq!(err.to_string(), "validation failed for input[:size]: expected one of small, large, got \"huge\"");
    }
}
