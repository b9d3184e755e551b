//! Trigger zones and the intersection state machine
//!
//! Every check computes the spy's trigger zone from the cached viewport and
//! classifies the element against it:
//!
//! ```text
//! viewport  |=================================|
//! zone          |-------------------|            offset / size
//! element                  [#####]               Inside
//! element  [##]                                  Before (up / left)
//! element                                [##]    After  (down / right)
//! ```
//!
//! Without `contain`, any overlap counts as inside. With `contain`, the zone
//! has to cover the whole element, and an element that is not covered is
//! placed by comparing midpoints.
//!
//! A spy only reports a state when it differs from the last one. The first
//! check after registration always reports, since no state is stored yet.

use std::fmt;

use tracing::trace;

use crate::config::{Axis, SpyConfig};
use crate::geometry::{ElementExtent, ViewportState};
use crate::registry::{SpyId, SpyRecord};

/// Position of an element relative to its trigger zone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpyState {
    /// In (or overlapping) the zone
    Inside,
    /// The zone has moved past the element: it is above or to the left
    Before,
    /// The zone has not reached the element yet: it is below or to the right
    After,
}

impl SpyState {
    pub fn is_inside(self) -> bool {
        self == SpyState::Inside
    }

    /// Name of the state on an axis: `inside`, `up`, `down`, `left`, `right`
    pub fn name(self, axis: Axis) -> &'static str {
        match (self, axis) {
            (SpyState::Inside, _) => "inside",
            (SpyState::Before, Axis::Vertical) => "up",
            (SpyState::After, Axis::Vertical) => "down",
            (SpyState::Before, Axis::Horizontal) => "left",
            (SpyState::After, Axis::Horizontal) => "right",
        }
    }
}

/// Payload handed to callbacks on a state change
#[derive(Clone, Debug, PartialEq)]
pub struct SpyEvent<E> {
    pub id: SpyId,
    pub element: E,
    pub state: SpyState,
    pub axis: Axis,
}

impl<E> SpyEvent<E> {
    pub fn is_inside(&self) -> bool {
        self.state.is_inside()
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name(self.axis)
    }
}

impl<E> fmt::Display for SpyEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.state_name())
    }
}

/// The part of the viewport that counts as inside, in scroll coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerZone {
    pub start: f64,
    pub size: f64,
    pub end: f64,
}

impl TriggerZone {
    /// Compute the zone for a config, or `None` if a ratio spec is malformed
    pub fn compute(viewport: &ViewportState, config: &SpyConfig) -> Option<Self> {
        let extent = viewport.extent(config.axis);
        let size = config.size.resolve(extent, 0.0)?;
        let offset = config.offset.resolve(extent, -size)?;
        let start = viewport.position(config.axis) + offset;

        Some(Self {
            start,
            size,
            end: start + size,
        })
    }

    pub fn midpoint(&self) -> f64 {
        self.start + self.size / 2.0
    }

    /// Classify an element against this zone
    pub fn classify(&self, element: &ElementExtent, contain: bool) -> SpyState {
        if contain {
            if self.start <= element.start && self.end >= element.end {
                SpyState::Inside
            } else if self.midpoint() > element.midpoint() {
                SpyState::Before
            } else {
                SpyState::After
            }
        } else if self.overlaps(element) {
            SpyState::Inside
        } else if self.start > element.end {
            SpyState::Before
        } else {
            SpyState::After
        }
    }

    fn overlaps(&self, element: &ElementExtent) -> bool {
        let start_within = self.start > element.start && self.start < element.end;
        let end_within = self.end > element.start && self.end < element.end;
        let covers_start = self.start <= element.start && self.end >= element.start;
        let covers_end = self.start <= element.end && self.end >= element.end;

        start_within || end_within || covers_start || covers_end
    }
}

/// Recompute a spy's state against the viewport
///
/// Returns the new state when it differs from the stored one, after storing
/// it. Returns `None` when nothing changed, when the spy has no measured
/// extent, or when its ratio specs are malformed.
pub fn evaluate<E>(record: &mut SpyRecord<E>, viewport: &ViewportState) -> Option<SpyState> {
    let extent = record.extent?;
    let config = record.config();
    let zone = TriggerZone::compute(viewport, config)?;
    let state = zone.classify(&extent, config.contain);

    trace!(
        spy = %record.id(),
        zone_start = zone.start,
        zone_end = zone.end,
        element_start = extent.start,
        element_end = extent.end,
        state = state.name(config.axis),
        "Evaluated spy"
    );

    if record.state == Some(state) {
        return None;
    }
    record.state = Some(state);
    Some(state)
}
