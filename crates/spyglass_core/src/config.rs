//! Spy configuration
//!
//! Options are supplied in layers, each of which may leave any field unset:
//!
//! 1. Built-in defaults ([`SpyConfig::default`])
//! 2. Instance-wide options given when the engine is created
//! 3. Per-call options given to `add`
//!
//! [`SpyConfig::resolve`] folds the layers into an immutable config that is
//! stored with each spy at registration time.
//!
//! ```rust
//! use spyglass_core::config::{Axis, SpyConfig, SpyOptions};
//!
//! let instance = SpyOptions::new().size("50%");
//! let call = SpyOptions::new().horizontal(true).contain(true);
//!
//! let config = SpyConfig::resolve([&instance, &call]);
//! assert_eq!(config.axis, Axis::Horizontal);
//! assert_eq!(config.size.to_string(), "50%");
//! assert!(config.contain);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ratio::RatioSpec;

/// Throttle interval used when no layer sets one
pub const DEFAULT_DELAY_MS: u64 = 100;

/// The scroll axis a spy tracks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// One layer of options, every field optional
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpyOptions {
    /// Throttle interval in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Track the horizontal axis instead of the vertical one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<bool>,
    /// Trigger zone start, from the top (or left) of the viewport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<RatioSpec>,
    /// Trigger zone size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<RatioSpec>,
    /// Require the element to be fully inside the zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contain: Option<bool>,
}

impl SpyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, millis: u64) -> Self {
        self.delay = Some(millis);
        self
    }

    pub fn horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = Some(horizontal);
        self
    }

    pub fn offset(mut self, offset: impl Into<RatioSpec>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn size(mut self, size: impl Into<RatioSpec>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn contain(mut self, contain: bool) -> Self {
        self.contain = Some(contain);
        self
    }

    /// Layer `over` on top of `self`; fields set in `over` win
    pub fn merged(&self, over: &SpyOptions) -> SpyOptions {
        SpyOptions {
            delay: over.delay.or(self.delay),
            horizontal: over.horizontal.or(self.horizontal),
            offset: over.offset.clone().or_else(|| self.offset.clone()),
            size: over.size.clone().or_else(|| self.size.clone()),
            contain: over.contain.or(self.contain),
        }
    }
}

/// Fully resolved configuration of a spy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpyConfig {
    /// Throttle interval. Only the engine-level value drives event throttling.
    pub delay: Duration,
    pub axis: Axis,
    pub offset: RatioSpec,
    pub size: RatioSpec,
    pub contain: bool,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            axis: Axis::Vertical,
            offset: RatioSpec::Number(0),
            size: RatioSpec::Text("100%".to_string()),
            contain: false,
        }
    }
}

impl SpyConfig {
    /// Fold option layers over the defaults, later layers winning
    pub fn resolve<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a SpyOptions>,
    {
        layers.into_iter().fold(Self::default(), |config, layer| Self {
            delay: layer.delay.map(Duration::from_millis).unwrap_or(config.delay),
            axis: match layer.horizontal {
                Some(true) => Axis::Horizontal,
                Some(false) => Axis::Vertical,
                None => config.axis,
            },
            offset: layer.offset.clone().unwrap_or(config.offset),
            size: layer.size.clone().unwrap_or(config.size),
            contain: layer.contain.unwrap_or(config.contain),
        })
    }

    /// Check both ratio specs eagerly
    pub fn validate(&self) -> Result<()> {
        self.offset.validate()?;
        self.size.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpyConfig::resolve(&[] as &[SpyOptions]);
        assert_eq!(config, SpyConfig::default());
        assert_eq!(config.delay, Duration::from_millis(100));
        assert_eq!(config.axis, Axis::Vertical);
        assert_eq!(config.offset, RatioSpec::Number(0));
        assert_eq!(config.size, RatioSpec::from("100%"));
        assert!(!config.contain);
    }

    #[test]
    fn test_later_layers_win() {
        let instance = SpyOptions::new().delay(250).offset(20i64).contain(true);
        let call = SpyOptions::new().offset("-30%").contain(false);

        let config = SpyConfig::resolve([&instance, &call]);

        assert_eq!(config.delay, Duration::from_millis(250));
        assert_eq!(config.offset, RatioSpec::from("-30%"));
        assert!(!config.contain);
        // Untouched by either layer
        assert_eq!(config.size, RatioSpec::from("100%"));
    }

    #[test]
    fn test_horizontal_false_overrides_instance_axis() {
        let instance = SpyOptions::new().horizontal(true);
        let call = SpyOptions::new().horizontal(false);

        assert_eq!(SpyConfig::resolve([&instance]).axis, Axis::Horizontal);
        assert_eq!(SpyConfig::resolve([&instance, &call]).axis, Axis::Vertical);
    }

    #[test]
    fn test_merged_matches_resolve() {
        let base = SpyOptions::new().size("40%").delay(10);
        let over = SpyOptions::new().size(120i64);

        let merged = base.merged(&over);
        assert_eq!(merged.size, Some(RatioSpec::Number(120)));
        assert_eq!(merged.delay, Some(10));
        assert_eq!(
            SpyConfig::resolve([&merged]),
            SpyConfig::resolve([&base, &over])
        );
    }

    #[test]
    fn test_validate_reports_malformed_ratio() {
        let config = SpyConfig::resolve([&SpyOptions::new().size("lots")]);
        assert!(config.validate().is_err());
        assert!(SpyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_options_from_toml() {
        let options: SpyOptions = toml::from_str(
            r#"
            delay = 50
            horizontal = true
            offset = -120
            size = "25%"
            "#,
        )
        .unwrap();

        assert_eq!(options.delay, Some(50));
        assert_eq!(options.horizontal, Some(true));
        assert_eq!(options.offset, Some(RatioSpec::Number(-120)));
        assert_eq!(options.size, Some(RatioSpec::from("25%")));
        assert_eq!(options.contain, None);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let parsed: std::result::Result<SpyOptions, _> = toml::from_str("sise = \"10%\"");
        assert!(parsed.is_err());
    }
}
