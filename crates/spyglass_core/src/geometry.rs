//! Viewport and element geometry
//!
//! [`GeometryTracker`] caches the scroll position, inner size and document
//! offset of one scroll context. Position and size are refreshed on scroll
//! and resize respectively. The base offset is captured once when the
//! tracker is created; if the context itself moves in the document, element
//! extents measured against it go stale until the spies are reloaded.

use crate::config::Axis;
use crate::error::Result;
use crate::host::Host;

/// Cached state of a scroll context
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportState {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub width: f64,
    pub height: f64,
    pub base_offset_top: f64,
    pub base_offset_left: f64,
}

impl ViewportState {
    /// Scroll position along an axis
    pub fn position(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.scroll_top,
            Axis::Horizontal => self.scroll_left,
        }
    }

    /// Visible length along an axis
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }

    /// Document offset of the context along an axis
    pub fn base_offset(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.base_offset_top,
            Axis::Horizontal => self.base_offset_left,
        }
    }
}

/// An element's span along the tracked axis, relative to the base offset
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementExtent {
    pub start: f64,
    pub size: f64,
    pub end: f64,
}

impl ElementExtent {
    pub fn new(start: f64, size: f64) -> Self {
        Self {
            start,
            size,
            end: start + size,
        }
    }

    pub fn midpoint(&self) -> f64 {
        self.start + self.size / 2.0
    }
}

/// Owner of the cached [`ViewportState`] for one context
#[derive(Clone, Debug)]
pub struct GeometryTracker {
    state: ViewportState,
}

impl GeometryTracker {
    /// Measure a context, including its base offset
    pub fn capture<H: Host + ?Sized>(host: &H, context: &H::Context) -> Result<Self> {
        let scroll = host.scroll_position(context)?;
        let size = host.inner_size(context)?;
        let base = host.context_offset(context).unwrap_or_default();

        Ok(Self {
            state: ViewportState {
                scroll_top: scroll.top,
                scroll_left: scroll.left,
                width: size.width,
                height: size.height,
                base_offset_top: base.top,
                base_offset_left: base.left,
            },
        })
    }

    /// Build a tracker from known state
    pub fn with_state(state: ViewportState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Re-read the scroll position
    pub fn refresh_position<H: Host + ?Sized>(
        &mut self,
        host: &H,
        context: &H::Context,
    ) -> Result<()> {
        let scroll = host.scroll_position(context)?;
        self.state.scroll_top = scroll.top;
        self.state.scroll_left = scroll.left;
        Ok(())
    }

    /// Re-read the inner size
    pub fn refresh_size<H: Host + ?Sized>(&mut self, host: &H, context: &H::Context) -> Result<()> {
        let size = host.inner_size(context)?;
        self.state.width = size.width;
        self.state.height = size.height;
        Ok(())
    }

    /// Re-read scroll position and inner size
    pub fn refresh<H: Host + ?Sized>(&mut self, host: &H, context: &H::Context) -> Result<()> {
        self.refresh_position(host, context)?;
        self.refresh_size(host, context)
    }

    /// Measure an element along `axis`, relative to the base offset
    pub fn measure<H: Host + ?Sized>(
        &self,
        host: &H,
        element: &H::Element,
        axis: Axis,
    ) -> Result<ElementExtent> {
        let offset = host.element_offset(element)?;
        let outer = host.element_outer_size(element)?;

        let (position, size) = match axis {
            Axis::Vertical => (offset.top, outer.height),
            Axis::Horizontal => (offset.left, outer.width),
        };

        Ok(ElementExtent::new(
            position - self.state.base_offset(axis),
            size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use crate::host::{Extent, Offset};

    #[test]
    fn test_capture_root_window() {
        let host = HeadlessHost::new(1024.0, 768.0);
        host.scroll_to(host.root(), 120.0, 40.0);

        let tracker = GeometryTracker::capture(&host, &host.root()).unwrap();

        assert_eq!(
            tracker.state(),
            ViewportState {
                scroll_top: 120.0,
                scroll_left: 40.0,
                width: 1024.0,
                height: 768.0,
                base_offset_top: 0.0,
                base_offset_left: 0.0,
            }
        );
    }

    #[test]
    fn test_refresh_is_split_by_event_kind() {
        let host = HeadlessHost::new(1024.0, 768.0);
        let mut tracker = GeometryTracker::capture(&host, &host.root()).unwrap();

        host.scroll_to(host.root(), 300.0, 0.0);
        host.resize(host.root(), 640.0, 480.0);

        tracker.refresh_position(&host, &host.root()).unwrap();
        assert_eq!(tracker.state().scroll_top, 300.0);
        assert_eq!(tracker.state().height, 768.0);

        tracker.refresh_size(&host, &host.root()).unwrap();
        assert_eq!(tracker.state().height, 480.0);
        assert_eq!(tracker.state().width, 640.0);
    }

    #[test]
    fn test_measure_relative_to_container() {
        let host = HeadlessHost::new(1024.0, 768.0);
        let panel = host.add_surface(Offset::new(200.0, 50.0), Extent::new(400.0, 300.0));
        let node = host.add_node(Offset::new(450.0, 90.0), Extent::new(120.0, 60.0));

        let tracker = GeometryTracker::capture(&host, &panel).unwrap();

        let vertical = tracker.measure(&host, &node, Axis::Vertical).unwrap();
        assert_eq!(vertical, ElementExtent::new(250.0, 60.0));
        assert_eq!(vertical.end, 310.0);

        let horizontal = tracker.measure(&host, &node, Axis::Horizontal).unwrap();
        assert_eq!(horizontal, ElementExtent::new(40.0, 120.0));
    }

    #[test]
    fn test_base_offset_is_not_refreshed() {
        let host = HeadlessHost::new(1024.0, 768.0);
        let panel = host.add_surface(Offset::new(200.0, 0.0), Extent::new(400.0, 300.0));
        let mut tracker = GeometryTracker::capture(&host, &panel).unwrap();

        tracker.refresh(&host, &panel).unwrap();
        assert_eq!(tracker.state().base_offset_top, 200.0);
    }

    #[test]
    fn test_unknown_context_fails() {
        let host = HeadlessHost::new(1024.0, 768.0);
        let other = HeadlessHost::new(10.0, 10.0);
        let foreign = other.add_surface(Offset::ZERO, Extent::new(5.0, 5.0));

        assert!(GeometryTracker::capture(&host, &foreign).is_err());
    }

    #[test]
    fn test_axis_accessors() {
        let state = ViewportState {
            scroll_top: 1.0,
            scroll_left: 2.0,
            width: 3.0,
            height: 4.0,
            base_offset_top: 5.0,
            base_offset_left: 6.0,
        };

        assert_eq!(state.position(Axis::Vertical), 1.0);
        assert_eq!(state.position(Axis::Horizontal), 2.0);
        assert_eq!(state.extent(Axis::Vertical), 4.0);
        assert_eq!(state.extent(Axis::Horizontal), 3.0);
        assert_eq!(state.base_offset(Axis::Horizontal), 6.0);
    }
}
