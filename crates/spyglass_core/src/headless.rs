//! In-memory host with a virtual clock
//!
//! `HeadlessHost` implements [`Host`] without a UI toolkit. It models
//! scroll surfaces (the top-level window plus any nested containers) and
//! nodes with fixed document rects. Scroll and resize events are emitted
//! synchronously, and time only moves when [`HeadlessHost::advance`] is
//! called, which makes throttled behavior fully deterministic.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use spyglass_core::headless::HeadlessHost;
//! use spyglass_core::host::{Extent, Offset};
//!
//! let host = HeadlessHost::new(1024.0, 500.0);
//! let node = host.add_node(Offset::new(600.0, 0.0), Extent::new(200.0, 100.0));
//!
//! host.scroll_to(host.root(), 300.0, 0.0);
//! host.advance(Duration::from_millis(100));
//! # let _ = node;
//! ```

use std::cell::RefCell;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, SpyError};
use crate::host::{
    Extent, Host, ListenerCallback, ListenerId, Offset, Scheduler, TimerCallback, TimerId,
    ViewportEvent,
};

new_key_type! {
    /// A scrollable surface (window or container)
    pub struct SurfaceId;
    /// A node with a document rect
    pub struct NodeId;
}

struct Surface {
    scroll: Offset,
    size: Extent,
    /// Document position, `None` for the root window
    offset: Option<Offset>,
}

struct Node {
    offset: Offset,
    size: Extent,
    attached: bool,
}

struct Listener {
    surface: SurfaceId,
    event: ViewportEvent,
    handler: ListenerCallback,
}

struct PendingTimer {
    due: Duration,
    /// Scheduling order, breaks ties between equal deadlines
    seq: u64,
    callback: TimerCallback,
}

struct HeadlessState {
    now: Duration,
    next_seq: u64,
    root: SurfaceId,
    surfaces: SlotMap<SurfaceId, Surface>,
    nodes: SlotMap<NodeId, Node>,
    listeners: SlotMap<ListenerId, Listener>,
    timers: SlotMap<TimerId, PendingTimer>,
}

/// In-memory [`Host`] implementation
pub struct HeadlessHost {
    state: RefCell<HeadlessState>,
}

impl HeadlessHost {
    /// Create a host whose root window has the given inner size
    pub fn new(width: f64, height: f64) -> Self {
        let mut surfaces = SlotMap::with_key();
        let root = surfaces.insert(Surface {
            scroll: Offset::ZERO,
            size: Extent::new(width, height),
            offset: None,
        });

        Self {
            state: RefCell::new(HeadlessState {
                now: Duration::ZERO,
                next_seq: 0,
                root,
                surfaces,
                nodes: SlotMap::with_key(),
                listeners: SlotMap::with_key(),
                timers: SlotMap::with_key(),
            }),
        }
    }

    /// The root window surface
    pub fn root(&self) -> SurfaceId {
        self.state.borrow().root
    }

    /// Add a nested scroll container at a document position
    pub fn add_surface(&self, offset: Offset, size: Extent) -> SurfaceId {
        self.state.borrow_mut().surfaces.insert(Surface {
            scroll: Offset::ZERO,
            size,
            offset: Some(offset),
        })
    }

    /// Add a node at a document position
    pub fn add_node(&self, offset: Offset, size: Extent) -> NodeId {
        self.state.borrow_mut().nodes.insert(Node {
            offset,
            size,
            attached: true,
        })
    }

    /// Move a node. Watchers only notice after a reload.
    pub fn move_node(&self, node: NodeId, offset: Offset) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(node) {
            n.offset = offset;
        }
    }

    /// Resize a node. Watchers only notice after a reload.
    pub fn resize_node(&self, node: NodeId, size: Extent) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(node) {
            n.size = size;
        }
    }

    /// Detach a node so that measuring it fails
    pub fn detach_node(&self, node: NodeId) {
        if let Some(n) = self.state.borrow_mut().nodes.get_mut(node) {
            n.attached = false;
        }
    }

    /// Set the scroll position of a surface and emit a scroll event
    pub fn scroll_to(&self, surface: SurfaceId, top: f64, left: f64) {
        if let Some(s) = self.state.borrow_mut().surfaces.get_mut(surface) {
            s.scroll = Offset::new(top, left);
        }
        self.emit(surface, ViewportEvent::Scroll);
    }

    /// Set the inner size of a surface and emit a resize event
    pub fn resize(&self, surface: SurfaceId, width: f64, height: f64) {
        if let Some(s) = self.state.borrow_mut().surfaces.get_mut(surface) {
            s.size = Extent::new(width, height);
        }
        self.emit(surface, ViewportEvent::Resize);
    }

    /// Invoke every handler subscribed to `event` on `surface`
    pub fn emit(&self, surface: SurfaceId, event: ViewportEvent) {
        // Handlers may subscribe or unsubscribe, so release the borrow first
        let handlers: Vec<ListenerCallback> = self
            .state
            .borrow()
            .listeners
            .values()
            .filter(|l| l.surface == surface && l.event == event)
            .map(|l| l.handler.clone())
            .collect();

        for handler in handlers {
            handler();
        }
    }

    /// Move the virtual clock forward, firing due timers in deadline order
    ///
    /// Timers scheduled by a firing timer run in the same call if they fall
    /// due before the new time.
    pub fn advance(&self, by: Duration) {
        let target = self.state.borrow().now + by;

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .timers
                    .iter()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(id, _)| id);

                match due.and_then(|id| state.timers.remove(id)) {
                    Some(timer) => {
                        state.now = state.now.max(timer.due);
                        Some(timer.callback)
                    }
                    None => None,
                }
            };

            match next {
                Some(callback) => callback(),
                None => break,
            }
        }

        self.state.borrow_mut().now = target;
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Number of live subscriptions on a surface
    pub fn listener_count(&self, surface: SurfaceId) -> usize {
        self.state
            .borrow()
            .listeners
            .values()
            .filter(|l| l.surface == surface)
            .count()
    }
}

impl Scheduler for HeadlessHost {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.insert(PendingTimer { due, seq, callback })
    }

    fn clear_timeout(&self, id: TimerId) {
        self.state.borrow_mut().timers.remove(id);
    }
}

impl Host for HeadlessHost {
    type Element = NodeId;
    type Context = SurfaceId;

    fn root_context(&self) -> SurfaceId {
        self.root()
    }

    fn scroll_position(&self, context: &SurfaceId) -> Result<Offset> {
        self.state
            .borrow()
            .surfaces
            .get(*context)
            .map(|s| s.scroll)
            .ok_or_else(|| SpyError::UnknownContext(format!("{:?}", context)))
    }

    fn inner_size(&self, context: &SurfaceId) -> Result<Extent> {
        self.state
            .borrow()
            .surfaces
            .get(*context)
            .map(|s| s.size)
            .ok_or_else(|| SpyError::UnknownContext(format!("{:?}", context)))
    }

    fn context_offset(&self, context: &SurfaceId) -> Option<Offset> {
        self.state
            .borrow()
            .surfaces
            .get(*context)
            .and_then(|s| s.offset)
    }

    fn element_offset(&self, element: &NodeId) -> Result<Offset> {
        self.with_attached(element, |n| n.offset)
    }

    fn element_outer_size(&self, element: &NodeId) -> Result<Extent> {
        self.with_attached(element, |n| n.size)
    }

    fn subscribe(
        &self,
        context: &SurfaceId,
        event: ViewportEvent,
        handler: ListenerCallback,
    ) -> ListenerId {
        self.state.borrow_mut().listeners.insert(Listener {
            surface: *context,
            event,
            handler,
        })
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }
}

impl HeadlessHost {
    fn with_attached<T>(&self, node: &NodeId, f: impl FnOnce(&Node) -> T) -> Result<T> {
        let state = self.state.borrow();
        match state.nodes.get(*node) {
            Some(n) if n.attached => Ok(f(n)),
            Some(_) => Err(SpyError::Measurement(format!("node {:?} is detached", node))),
            None => Err(SpyError::Measurement(format!("node {:?} does not exist", node))),
        }
    }
}
