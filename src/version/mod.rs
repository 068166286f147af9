//! Dotted-integer app versions.
//!
//! App manifests carry versions such as `1`, `1.2` or `2.0.13`: a non-empty
//! sequence of non-negative integers separated by dots. There are no prerelease
//! or build suffixes. Versions of unequal length compare as if the shorter one
//! were padded with zeros, so `1.2` and `1.2.0` are the same version.
//!
//! # Module Organization
//!
//! - [`DottedVersion`] - Parsed version with a total order
//! - [`comparison`] - String-level comparison helpers used by update checks
//!
//! # Examples
//!
//! ```rust,no_run
//! use appdock::version::DottedVersion;
//!
//! # fn example() -> Result<(), appdock::core::AppError> {
//! let installed: DottedVersion = "1.2".parse()?;
//! let remote: DottedVersion = "1.10".parse()?;
//! assert!(remote > installed);
//! assert_eq!(installed, "1.2.0".parse()?);
//! # Ok(())
//! # }
//! ```

pub mod comparison;

use crate::core::AppError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub use comparison::{compare, is_newer};

/// A parsed dotted-integer version.
///
/// The original text is kept so that a manifest is re-written with the version
/// exactly as its author spelled it. Equality and ordering ignore trailing zero
/// components; [`DottedVersion::as_str`] does not.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    components: Vec<u64>,
    raw: String,
}

impl DottedVersion {
    /// Numeric components, left to right.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// The version as originally written (surrounding whitespace removed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for DottedVersion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |reason: &str| AppError::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("version is empty"));
        }

        let mut components = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(invalid("empty version component"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(&format!("component '{part}' is not a non-negative integer")));
            }
            let value = part
                .parse::<u64>()
                .map_err(|_| invalid(&format!("component '{part}' is too large")))?;
            components.push(value);
        }

        Ok(Self {
            components,
            raw: raw.to_string(),
        })
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for DottedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DottedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DottedVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_components() {
        assert_eq!(v("1.2.3").components(), &[1, 2, 3]);
        assert_eq!(v("7").components(), &[7]);
        assert_eq!(v(" 0.10 ").as_str(), "0.10");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "1..2", ".1", "1.", "1.a", "v1.0", "1.0-beta", "-1", "1.+2"] {
            let err = bad.parse::<DottedVersion>().unwrap_err();
            assert!(
                matches!(err, AppError::InvalidVersion { .. }),
                "expected InvalidVersion for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_zero_padding_equality() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert_ne!(v("1.2"), v("1.2.1"));
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.9.9"));
        assert!(v("0.0.1") > v("0"));
    }

    #[test]
    fn test_display_keeps_original_spelling() {
        assert_eq!(v("1.2.0").to_string(), "1.2.0");
        assert_eq!(v("01.2").to_string(), "01.2");
        assert_eq!(v("01.2"), v("1.2"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("3.1")).unwrap();
        assert_eq!(json, "\"3.1\"");
        let parsed: DottedVersion = serde_json::from_str("\"3.1.0\"").unwrap();
        assert_eq!(parsed, v("3.1"));
        assert!(serde_json::from_str::<DottedVersion>("\"x\"").is_err());
    }
}
