//! Trigger-zone magnitudes
//!
//! A magnitude is either absolute (`120`, `-40`) or a percentage of a
//! reference length (`50%`, `-25%`). Negative magnitudes count back from the
//! far end of the reference length, so with a 500px viewport `-100` resolves
//! to `400` and `-50%` resolves to `250`.
//!
//! An optional adjustment is added to negative magnitudes only. The engine
//! passes `-trigger_size` when resolving the zone offset so that `-0` style
//! specs place the zone flush against the far edge.
//!
//! ```rust
//! use spyglass_core::ratio::{parse_ratio, Ratio};
//!
//! assert_eq!(parse_ratio("50%", 200.0, 0.0), Some(100.0));
//! assert_eq!(parse_ratio("-10", 200.0, 0.0), Some(190.0));
//! assert_eq!(parse_ratio("abc", 200.0, 0.0), None);
//!
//! let ratio: Ratio = "-25%".parse().unwrap();
//! assert_eq!(ratio.resolve(400.0, -100.0), 200.0);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SpyError};

static RATIO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?[0-9]+)(%)?$").expect("ratio pattern is valid"));

/// A parsed magnitude
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ratio {
    /// Absolute length in pixels
    Absolute(i64),
    /// Percentage of the reference length
    Percent(i64),
}

impl Ratio {
    /// Resolve against a reference length.
    ///
    /// Negative results are reinterpreted as `total + value + adjustment`.
    pub fn resolve(self, total: f64, adjustment: f64) -> f64 {
        let value = match self {
            Ratio::Absolute(n) => n as f64,
            Ratio::Percent(n) => total / 100.0 * n as f64,
        };

        if value < 0.0 {
            total + value + adjustment
        } else {
            value
        }
    }
}

impl FromStr for Ratio {
    type Err = SpyError;

    fn from_str(s: &str) -> Result<Self> {
        let captures = RATIO_PATTERN
            .captures(s)
            .ok_or_else(|| SpyError::MalformedRatio(s.to_string()))?;

        // The pattern admits digit runs that overflow i64
        let number: i64 = captures[1]
            .parse()
            .map_err(|_| SpyError::MalformedRatio(s.to_string()))?;

        Ok(if captures.get(2).is_some() {
            Ratio::Percent(number)
        } else {
            Ratio::Absolute(number)
        })
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Absolute(n) => write!(f, "{}", n),
            Ratio::Percent(n) => write!(f, "{}%", n),
        }
    }
}

/// A magnitude as supplied by the caller, validated lazily
///
/// Options accept either a bare integer or a string. Strings are only parsed
/// when a trigger zone is computed, so one malformed spec disables the spy
/// that carries it and nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatioSpec {
    Number(i64),
    Text(String),
}

impl RatioSpec {
    /// Parse into a [`Ratio`]
    pub fn ratio(&self) -> Result<Ratio> {
        match self {
            RatioSpec::Number(n) => Ok(Ratio::Absolute(*n)),
            RatioSpec::Text(text) => text.parse(),
        }
    }

    /// Check the spec without resolving it
    pub fn validate(&self) -> Result<()> {
        self.ratio().map(|_| ())
    }

    /// Resolve against a reference length, or `None` if the spec is malformed
    pub fn resolve(&self, total: f64, adjustment: f64) -> Option<f64> {
        match self.ratio() {
            Ok(ratio) => Some(ratio.resolve(total, adjustment)),
            Err(err) => {
                debug!(spec = %self, error = %err, "Failed to parse ratio");
                None
            }
        }
    }
}

impl fmt::Display for RatioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatioSpec::Number(n) => write!(f, "{}", n),
            RatioSpec::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for RatioSpec {
    fn from(value: i64) -> Self {
        RatioSpec::Number(value)
    }
}

impl From<&str> for RatioSpec {
    fn from(value: &str) -> Self {
        RatioSpec::Text(value.to_string())
    }
}

impl From<String> for RatioSpec {
    fn from(value: String) -> Self {
        RatioSpec::Text(value)
    }
}

impl From<Ratio> for RatioSpec {
    fn from(value: Ratio) -> Self {
        match value {
            Ratio::Absolute(n) => RatioSpec::Number(n),
            Ratio::Percent(_) => RatioSpec::Text(value.to_string()),
        }
    }
}

/// Parse and resolve a magnitude in one step
///
/// Returns `None` when `value` is not of the form `-?<digits>[%]`.
pub fn parse_ratio(value: &str, total: f64, adjustment: f64) -> Option<f64> {
    value
        .parse::<Ratio>()
        .ok()
        .map(|ratio| ratio.resolve(total, adjustment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_total() {
        assert_eq!(parse_ratio("50%", 200.0, 0.0), Some(100.0));
        assert_eq!(parse_ratio("100%", 480.0, 0.0), Some(480.0));
        assert_eq!(parse_ratio("0%", 480.0, 0.0), Some(0.0));
    }

    #[test]
    fn test_absolute_values() {
        assert_eq!(parse_ratio("0", 200.0, 0.0), Some(0.0));
        assert_eq!(parse_ratio("75", 200.0, 0.0), Some(75.0));
        // Absolute values may exceed the reference length
        assert_eq!(parse_ratio("900", 200.0, 0.0), Some(900.0));
    }

    #[test]
    fn test_negative_counts_from_far_end() {
        assert_eq!(parse_ratio("-10", 200.0, 0.0), Some(190.0));
        assert_eq!(parse_ratio("-50%", 200.0, 0.0), Some(100.0));
    }

    #[test]
    fn test_adjustment_only_applies_to_negative_values() {
        assert_eq!(parse_ratio("-10", 200.0, -50.0), Some(140.0));
        assert_eq!(parse_ratio("10", 200.0, -50.0), Some(10.0));
        assert_eq!(parse_ratio("25%", 200.0, -50.0), Some(50.0));
    }

    #[test]
    fn test_malformed_input() {
        for bad in ["abc", "", "%", "-", "10px", "1.5", " 10", "10 %", "--5", "5%%"] {
            assert_eq!(parse_ratio(bad, 200.0, 0.0), None, "{:?} should fail", bad);
        }
        assert!(matches!(
            "12a".parse::<Ratio>(),
            Err(SpyError::MalformedRatio(s)) if s == "12a"
        ));
    }

    #[test]
    fn test_overflowing_digits_are_malformed() {
        assert_eq!(parse_ratio("99999999999999999999999", 200.0, 0.0), None);
    }

    #[test]
    fn test_spec_resolution() {
        assert_eq!(RatioSpec::from(40i64).resolve(200.0, 0.0), Some(40.0));
        assert_eq!(RatioSpec::from("-40").resolve(200.0, 0.0), Some(160.0));
        assert_eq!(RatioSpec::from("half").resolve(200.0, 0.0), None);
        assert!(RatioSpec::from("half").validate().is_err());
        assert!(RatioSpec::from("100%").validate().is_ok());
    }

    #[test]
    fn test_display_round_trips_through_spec() {
        assert_eq!(Ratio::Percent(-25).to_string(), "-25%");
        assert_eq!(RatioSpec::from(Ratio::Percent(30)), RatioSpec::from("30%"));
        assert_eq!(RatioSpec::from(Ratio::Absolute(-3)), RatioSpec::Number(-3));
    }
}
