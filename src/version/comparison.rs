//! Version comparison utilities for update checks.
//!
//! Update checks receive versions as plain strings: the installed version from
//! the local manifest and the remote version from the fetched one. These helpers
//! parse both at the boundary, so a malformed version is reported as
//! [`AppError::InvalidVersion`] instead of being coerced into something
//! comparable.
//!
//! # Examples
//!
//! ```rust,no_run
//! use appdock::version::comparison::{compare, is_newer};
//! use std::cmp::Ordering;
//!
//! # fn example() -> Result<(), appdock::core::AppError> {
//! assert_eq!(compare("1.2", "1.2.0")?, Ordering::Equal);
//! assert_eq!(compare("2.0", "1.9.9")?, Ordering::Greater);
//! assert!(is_newer("1.1", "1.0")?);
//! # Ok(())
//! # }
//! ```

use super::DottedVersion;
use crate::core::AppError;
use std::cmp::Ordering;

/// Compares two version strings component-wise, left to right.
///
/// The shorter version is padded with zeros and comparison stops at the first
/// unequal component.
///
/// # Errors
///
/// Returns [`AppError::InvalidVersion`] if either string is not a dotted
/// sequence of non-negative integers.
pub fn compare(a: &str, b: &str) -> Result<Ordering, AppError> {
    let a: DottedVersion = a.parse()?;
    let b: DottedVersion = b.parse()?;
    Ok(a.cmp(&b))
}

/// Returns `true` when `candidate` is strictly greater than `current`.
///
/// # Errors
///
/// Returns [`AppError::InvalidVersion`] if either string fails to parse.
pub fn is_newer(candidate: &str, current: &str) -> Result<bool, AppError> {
    Ok(compare(candidate, current)? == Ordering::Greater)
}

/// Maps an [`Ordering`] onto the conventional `-1`, `0`, `1`.
#[must_use]
pub const fn ordering_sign(ordering: Ordering) -> i8 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}
