//! Scenario file handling
//!
//! A scenario describes a viewport, the elements watched in it, and a
//! sequence of scroll and resize steps on a virtual clock:
//!
//! ```toml
//! [viewport]
//! width = 1024
//! height = 500
//!
//! [options]
//! delay = 100
//!
//! [[element]]
//! name = "intro"
//! top = 600
//! height = 100
//! options = { contain = true }
//!
//! [[step]]
//! at = 0
//! scroll_top = 300
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spyglass_core::{SpyConfig, SpyOptions};
use std::fs;
use std::path::Path;

/// A complete scenario file
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Instance-wide spy options
    #[serde(default)]
    pub options: SpyOptions,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementConfig>,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,
}

/// The scroll context under test
///
/// Without an offset the viewport is the top-level window. With one it is a
/// scrollable container placed at that document position.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default)]
    pub offset_top: Option<f64>,
    #[serde(default)]
    pub offset_left: Option<f64>,
}

fn default_width() -> f64 {
    1024.0
}

fn default_height() -> f64 {
    768.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            offset_top: None,
            offset_left: None,
        }
    }
}

impl ViewportConfig {
    /// Whether the viewport is a container rather than the window
    pub fn is_container(&self) -> bool {
        self.offset_top.is_some() || self.offset_left.is_some()
    }
}

/// A watched element, positioned in document coordinates
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElementConfig {
    pub name: String,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default = "default_element_width")]
    pub width: f64,
    #[serde(default = "default_element_height")]
    pub height: f64,
    /// Per-element spy options
    #[serde(default)]
    pub options: SpyOptions,
}

fn default_element_width() -> f64 {
    100.0
}

fn default_element_height() -> f64 {
    100.0
}

/// One step of the replay
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Virtual time in milliseconds at which the step runs
    #[serde(default)]
    pub at: Option<u64>,
    #[serde(default)]
    pub scroll_top: Option<f64>,
    #[serde(default)]
    pub scroll_left: Option<f64>,
    /// New viewport width, emitting a resize
    #[serde(default)]
    pub width: Option<f64>,
    /// New viewport height, emitting a resize
    #[serde(default)]
    pub height: Option<f64>,
    /// Milliseconds to advance the clock after the step
    #[serde(default)]
    pub advance: Option<u64>,
}

impl StepConfig {
    pub fn scrolls(&self) -> bool {
        self.scroll_top.is_some() || self.scroll_left.is_some()
    }

    pub fn resizes(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// A problem found by [`Scenario::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse a scenario from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolved configuration of an element
    pub fn config_for(&self, element: &ElementConfig) -> SpyConfig {
        SpyConfig::resolve([&self.options, &element.options])
    }

    /// Collect every problem that would make a replay misleading
    pub fn validate(&self) -> Vec<Problem> {
        let mut problems = Vec::new();

        if let Err(err) = SpyConfig::resolve([&self.options]).validate() {
            problems.push(Problem {
                location: "[options]".to_string(),
                message: err.to_string(),
            });
        }

        for (index, element) in self.elements.iter().enumerate() {
            let location = format!("element {} ({})", index, element.name);

            if let Err(err) = self.config_for(element).validate() {
                problems.push(Problem {
                    location: location.clone(),
                    message: err.to_string(),
                });
            }

            if self.elements[..index].iter().any(|e| e.name == element.name) {
                problems.push(Problem {
                    location,
                    message: "duplicate element name".to_string(),
                });
            }
        }

        let mut last_at = 0;
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(at) = step.at {
                if at < last_at {
                    problems.push(Problem {
                        location: format!("step {}", index),
                        message: format!("runs at {}ms, before the previous step", at),
                    });
                }
                last_at = last_at.max(at);
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [viewport]
        height = 500

        [options]
        delay = 50
        size = "80%"

        [[element]]
        name = "intro"
        top = 600
        options = { contain = true, offset = -20 }

        [[element]]
        name = "gallery"
        left = 1200
        width = 300
        options = { horizontal = true }

        [[step]]
        at = 0
        scroll_top = 300

        [[step]]
        at = 120
        height = 400
        advance = 200
    "#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::parse(SAMPLE).unwrap();

        assert_eq!(scenario.viewport.width, 1024.0);
        assert_eq!(scenario.viewport.height, 500.0);
        assert!(!scenario.viewport.is_container());
        assert_eq!(scenario.options.delay, Some(50));
        assert_eq!(scenario.elements.len(), 2);
        assert_eq!(scenario.elements[0].height, 100.0);
        assert_eq!(scenario.steps.len(), 2);
        assert!(scenario.steps[0].scrolls());
        assert!(scenario.steps[1].resizes());
        assert_eq!(scenario.steps[1].advance, Some(200));
    }

    #[test]
    fn test_element_config_layers_over_scenario_options() {
        let scenario = Scenario::parse(SAMPLE).unwrap();
        let config = scenario.config_for(&scenario.elements[0]);

        assert!(config.contain);
        assert_eq!(config.size.to_string(), "80%");
        assert_eq!(config.offset.to_string(), "-20");
        assert_eq!(config.delay.as_millis(), 50);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Scenario::parse("[viewport]\ndepth = 3\n").is_err());
        assert!(Scenario::parse("[options]\nthreshold = 3\n").is_err());
    }

    #[test]
    fn test_validate_reports_problems() {
        let scenario = Scenario::parse(
            r#"
            [options]
            offset = "top"

            [[element]]
            name = "a"
            options = { size = "1.5" }

            [[element]]
            name = "a"

            [[step]]
            at = 100

            [[step]]
            at = 50
            "#,
        )
        .unwrap();

        let problems = scenario.validate();
        let locations: Vec<&str> = problems.iter().map(|p| p.location.as_str()).collect();

        assert_eq!(
            locations,
            vec!["[options]", "element 0 (a)", "element 1 (a)", "element 1 (a)", "step 1"]
        );
    }

    #[test]
    fn test_valid_sample_has_no_problems() {
        assert!(Scenario::parse(SAMPLE).unwrap().validate().is_empty());
    }
}
