//! Host collaborator traits
//!
//! The spy engine never touches a UI toolkit directly. Measurement, event
//! subscription and timers are provided by the embedding host through the
//! traits in this module.
//!
//! ```text
//! Host scroll/resize event
//!     ↓ handler registered via Host::subscribe
//! Throttle (Scheduler::set_timeout for trailing calls)
//!     ↓
//! GeometryTracker refresh (Host measurement)
//!     ↓
//! Trigger zone evaluation per spy
//!     ↓ state changed
//! Callbacks
//! ```
//!
//! Subscriptions and timers are identified by explicit handles
//! ([`ListenerId`], [`TimerId`]) which are passed back for removal.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use slotmap::new_key_type;

use crate::error::Result;

new_key_type! {
    /// Handle for a scroll/resize subscription
    pub struct ListenerId;
    /// Handle for a pending one-shot timer
    pub struct TimerId;
}

/// Handler invoked by the host when a viewport event fires
///
/// Uses Rc since the event loop is single-threaded.
pub type ListenerCallback = Rc<dyn Fn()>;

/// Deferred one-shot callback
pub type TimerCallback = Box<dyn FnOnce()>;

/// Viewport events the engine listens for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    Scroll,
    Resize,
}

/// A position in document coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub top: f64,
    pub left: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { top: 0.0, left: 0.0 };

    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }
}

/// A measured extent
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Monotonic clock and one-shot timers driven by the host event loop
pub trait Scheduler {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Run `callback` once after `delay`
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancel a pending timer
    ///
    /// Cancelling a timer that already fired or was already cancelled is a
    /// no-op.
    fn clear_timeout(&self, id: TimerId);
}

/// Measurement and event subscription provided by the UI toolkit
pub trait Host: Scheduler {
    /// Opaque reference to a watched element
    type Element: Clone + PartialEq + fmt::Debug;
    /// Opaque reference to a scrollable context (a window or a container)
    type Context: Clone + PartialEq + fmt::Debug;

    /// The top-level window, used when no context is given
    fn root_context(&self) -> Self::Context;

    /// Current scroll position of a context
    fn scroll_position(&self, context: &Self::Context) -> Result<Offset>;

    /// Inner (visible) size of a context
    fn inner_size(&self, context: &Self::Context) -> Result<Extent>;

    /// Document position of a context, `None` for the top-level window
    fn context_offset(&self, context: &Self::Context) -> Option<Offset>;

    /// Document position of an element
    fn element_offset(&self, element: &Self::Element) -> Result<Offset>;

    /// Outer size of an element, including borders and padding
    fn element_outer_size(&self, element: &Self::Element) -> Result<Extent>;

    /// Register a handler for scroll or resize events on a context
    fn subscribe(
        &self,
        context: &Self::Context,
        event: ViewportEvent,
        handler: ListenerCallback,
    ) -> ListenerId;

    /// Remove a handler registered with [`Host::subscribe`]
    fn unsubscribe(&self, id: ListenerId);
}
