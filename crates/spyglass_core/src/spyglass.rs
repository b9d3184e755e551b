//! Spy engine instance
//!
//! A [`Spyglass`] watches one scroll context. It subscribes to the context's
//! scroll and resize events through the [`Host`], throttles them, refreshes
//! its cached viewport and re-checks every registered spy.
//!
//! ```text
//! scroll ─→ Throttle ─→ refresh position ─┐
//! resize ─→ Throttle ─→ refresh size ─────┴─→ check all spies ─→ callbacks
//! ```
//!
//! Callbacks run after the engine has released its internal borrow, so a
//! callback may call back into the engine (for example to remove its own
//! spy). Hold a [`WeakSpyglass`] inside callbacks to avoid a reference cycle.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use spyglass_core::headless::{HeadlessHost, NodeId};
//! use spyglass_core::host::{Extent, Offset};
//! use spyglass_core::{SpyEvent, SpyOptions, Spyglass};
//!
//! let host = Rc::new(HeadlessHost::new(1024.0, 500.0));
//! let banner = host.add_node(Offset::new(600.0, 0.0), Extent::new(300.0, 100.0));
//!
//! let spyglass = Spyglass::new(Rc::clone(&host), host.root(), SpyOptions::new(), None).unwrap();
//! spyglass.add(
//!     [banner],
//!     Some(Rc::new(|event: &SpyEvent<NodeId>| {
//!         println!("{} is {}", event.id, event.state_name());
//!     })),
//!     &SpyOptions::new(),
//! ).unwrap();
//!
//! host.scroll_to(host.root(), 300.0, 0.0);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::{SpyConfig, SpyOptions};
use crate::engine::{self, SpyEvent, SpyState};
use crate::error::{Result, SpyError};
use crate::geometry::{ElementExtent, GeometryTracker, ViewportState};
use crate::host::{Host, ListenerId, ViewportEvent};
use crate::registry::{SpyCallback, SpyId, SpyRef, SpyRegistry};
use crate::throttle::Throttle;

struct Inner<H: Host> {
    host: Rc<H>,
    context: H::Context,
    /// Instance-wide option layer
    options: SpyOptions,
    /// Engine-wide callback, runs before the per-spy callback
    callback: Option<SpyCallback<H::Element>>,
    registry: SpyRegistry<H::Element>,
    geometry: GeometryTracker,
    scroll: Throttle<H, ()>,
    resize: Throttle<H, ()>,
    listeners: SmallVec<[ListenerId; 2]>,
    destroyed: bool,
}

impl<H: Host> Drop for Inner<H> {
    fn drop(&mut self) {
        // Throttles cancel their own timers when dropped
        for id in self.listeners.drain(..) {
            self.host.unsubscribe(id);
        }
    }
}

/// Handle to a spy engine watching one scroll context (cheap to clone)
pub struct Spyglass<H: Host> {
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: Host> Clone for Spyglass<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a spy engine
pub struct WeakSpyglass<H: Host> {
    inner: Weak<RefCell<Inner<H>>>,
}

impl<H: Host> Clone for WeakSpyglass<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<H: Host> WeakSpyglass<H> {
    pub fn upgrade(&self) -> Option<Spyglass<H>> {
        self.inner.upgrade().map(|inner| Spyglass { inner })
    }
}

impl<H: Host + 'static> Spyglass<H> {
    /// Start watching `context`
    ///
    /// `options` is the instance-wide layer merged under every `add` call.
    /// Its `delay` sets the throttle interval for scroll and resize events.
    pub fn new(
        host: Rc<H>,
        context: H::Context,
        options: SpyOptions,
        callback: Option<SpyCallback<H::Element>>,
    ) -> Result<Self> {
        let geometry = GeometryTracker::capture(&*host, &context)?;
        let delay = SpyConfig::resolve([&options]).delay;

        let inner = Rc::new_cyclic(|weak: &Weak<RefCell<Inner<H>>>| {
            let scroll = {
                let weak = WeakSpyglass {
                    inner: weak.clone(),
                };
                Throttle::new(Rc::clone(&host), delay, move |_: ()| {
                    if let Some(spyglass) = weak.upgrade() {
                        spyglass.handle_scroll();
                    }
                })
            };
            let resize = {
                let weak = WeakSpyglass {
                    inner: weak.clone(),
                };
                Throttle::new(Rc::clone(&host), delay, move |_: ()| {
                    if let Some(spyglass) = weak.upgrade() {
                        spyglass.handle_resize();
                    }
                })
            };

            RefCell::new(Inner {
                host: Rc::clone(&host),
                context: context.clone(),
                options,
                callback,
                registry: SpyRegistry::new(),
                geometry,
                scroll,
                resize,
                listeners: SmallVec::new(),
                destroyed: false,
            })
        });

        let spyglass = Self { inner };
        spyglass.attach();

        debug!(
            context = ?context,
            delay_ms = delay.as_millis() as u64,
            "Spyglass created"
        );
        Ok(spyglass)
    }

    fn attach(&self) {
        let (host, context) = {
            let inner = self.inner.borrow();
            (Rc::clone(&inner.host), inner.context.clone())
        };

        let mut listeners = SmallVec::new();
        for event in [ViewportEvent::Scroll, ViewportEvent::Resize] {
            let weak = Rc::downgrade(&self.inner);
            let id = host.subscribe(
                &context,
                event,
                Rc::new(move || {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    // Clone the throttle out so no borrow is held while it runs
                    let throttle = match event {
                        ViewportEvent::Scroll => inner.borrow().scroll.clone(),
                        ViewportEvent::Resize => inner.borrow().resize.clone(),
                    };
                    throttle.call(());
                }),
            );
            listeners.push(id);
        }

        self.inner.borrow_mut().listeners = listeners;
    }
}

impl<H: Host> Spyglass<H> {
    /// Register elements
    ///
    /// Each element is measured and checked immediately, so its callback
    /// fires once with the current state. Adding an element that is already
    /// registered keeps its id, replaces its callback and configuration, and
    /// reports its state again.
    ///
    /// Fails with [`SpyError::Destroyed`] once the engine has been destroyed.
    pub fn add<I>(
        &self,
        elements: I,
        callback: Option<SpyCallback<H::Element>>,
        options: &SpyOptions,
    ) -> Result<Vec<SpyId>>
    where
        I: IntoIterator<Item = H::Element>,
    {
        let mut ids = Vec::new();

        for element in elements {
            let id = {
                let mut inner = self.inner.borrow_mut();
                if inner.destroyed {
                    return Err(SpyError::Destroyed);
                }
                let config = SpyConfig::resolve([&inner.options, options]);
                inner.registry.insert(element, callback.clone(), config)
            };

            self.load(&id);
            ids.push(id);
        }

        Ok(ids)
    }

    /// Re-measure registered elements and check them
    ///
    /// Unregistered elements are ignored.
    pub fn reload<I>(&self, elements: I)
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<H::Element>,
    {
        if !self.ensure_live("reload") {
            return;
        }
        for element in elements {
            if let Some(id) = self.resolve_id(SpyRef::Element(std::borrow::Borrow::borrow(&element))) {
                self.load(&id);
            }
        }
    }

    /// Re-measure and check every registered element
    pub fn reload_all(&self) {
        if !self.ensure_live("reload_all") {
            return;
        }
        for id in self.ids() {
            self.load(&id);
        }
    }

    /// Deregister elements. Returns how many were registered.
    pub fn remove<I>(&self, elements: I) -> usize
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<H::Element>,
    {
        elements
            .into_iter()
            .filter(|element| self.remove_ref(SpyRef::Element(<I::Item as std::borrow::Borrow<H::Element>>::borrow(element))))
            .count()
    }

    /// Deregister a spy by id. Returns whether it was registered.
    pub fn remove_id(&self, id: &SpyId) -> bool {
        self.remove_ref(SpyRef::from(id))
    }

    fn remove_ref(&self, target: SpyRef<'_, H::Element>) -> bool {
        // Keep the record alive until the borrow is released
        let removed = self.inner.borrow_mut().registry.remove(target);
        if let Some(record) = &removed {
            debug!(spy = %record.id(), "Spy removed");
        }
        removed.is_some()
    }

    /// Check one spy and dispatch if its state changed
    ///
    /// Unknown targets are ignored.
    pub fn check(&self, target: SpyRef<'_, H::Element>) {
        if !self.ensure_live("check") {
            return;
        }
        if let Some(id) = self.resolve_id(target) {
            self.check_id(&id);
        }
    }

    /// Check every spy in registration order
    ///
    /// Spies removed by a callback during the pass are skipped.
    pub fn check_all(&self) {
        if !self.ensure_live("check_all") {
            return;
        }
        for id in self.ids() {
            self.check_id(&id);
        }
    }

    /// Re-read the whole viewport from the host and check every spy
    pub fn refresh(&self) {
        if self.refresh_geometry(|geometry, host, context| geometry.refresh(host, context)) {
            self.check_all();
        }
    }

    /// Detach from the host and drop every spy
    ///
    /// Pending throttled calls are cancelled. Calling this more than once is
    /// harmless.
    pub fn destroy(&self) {
        let (host, listeners, registry) = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.scroll.cancel();
            inner.resize.cancel();
            (
                Rc::clone(&inner.host),
                std::mem::take(&mut inner.listeners),
                std::mem::take(&mut inner.registry),
            )
        };

        for id in listeners {
            host.unsubscribe(id);
        }

        debug!(spies = registry.len(), "Spyglass destroyed");
        drop(registry);
    }

    fn ensure_live(&self, operation: &'static str) -> bool {
        let destroyed = self.inner.borrow().destroyed;
        if destroyed {
            warn!(operation, "Ignoring call on a destroyed spyglass");
        }
        !destroyed
    }

    fn handle_scroll(&self) {
        if self.refresh_geometry(|geometry, host, context| {
            geometry.refresh_position(host, context)
        }) {
            self.check_all();
        }
    }

    fn handle_resize(&self) {
        if self.refresh_geometry(|geometry, host, context| geometry.refresh_size(host, context)) {
            self.check_all();
        }
    }

    fn refresh_geometry<F>(&self, refresh: F) -> bool
    where
        F: FnOnce(&mut GeometryTracker, &H, &H::Context) -> Result<()>,
    {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return false;
        }

        let Inner {
            host,
            context,
            geometry,
            ..
        } = &mut *inner;

        match refresh(geometry, &**host, &*context) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Failed to measure viewport; skipping check");
                false
            }
        }
    }

    /// Measure a spy's element, then check it
    fn load(&self, id: &SpyId) {
        {
            let mut inner = self.inner.borrow_mut();
            let Inner {
                host,
                registry,
                geometry,
                ..
            } = &mut *inner;

            let Some(record) = registry.get_mut(id.as_str()) else {
                return;
            };

            match geometry.measure(&**host, record.element(), record.config().axis) {
                Ok(extent) => record.extent = Some(extent),
                Err(err) => {
                    debug!(spy = %id, error = %err, "Failed to measure spy; skipping");
                    return;
                }
            }
        }

        self.check_id(id);
    }

    fn check_id(&self, id: &SpyId) {
        let (event, global, local) = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }

            let viewport = inner.geometry.state();
            let global = inner.callback.clone();

            let Some(record) = inner.registry.get_mut(id.as_str()) else {
                return;
            };
            let Some(state) = engine::evaluate(record, &viewport) else {
                return;
            };

            let event = SpyEvent {
                id: id.clone(),
                element: record.element().clone(),
                state,
                axis: record.config().axis,
            };
            debug!(spy = %id, state = event.state_name(), "Spy changed state");

            (event, global, record.callback().cloned())
        };

        if let Some(callback) = global {
            callback(&event);
        }
        if let Some(callback) = local {
            callback(&event);
        }
    }

    pub fn downgrade(&self) -> WeakSpyglass<H> {
        WeakSpyglass {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Canonical id of a spy, or `None` if it is not registered
    pub fn resolve_id(&self, target: SpyRef<'_, H::Element>) -> Option<SpyId> {
        self.inner.borrow().registry.resolve_id(target)
    }

    /// Last dispatched state of a spy
    pub fn state(&self, target: SpyRef<'_, H::Element>) -> Option<SpyState> {
        let inner = self.inner.borrow();
        let id = inner.registry.resolve_id(target)?;
        inner.registry.get(id.as_str()).and_then(|r| r.state())
    }

    /// Measured extent of a spy
    pub fn extent(&self, target: SpyRef<'_, H::Element>) -> Option<ElementExtent> {
        let inner = self.inner.borrow();
        let id = inner.registry.resolve_id(target)?;
        inner.registry.get(id.as_str()).and_then(|r| r.extent())
    }

    /// Live spy ids in registration order
    pub fn ids(&self) -> Vec<SpyId> {
        self.inner.borrow().registry.ids()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().registry.is_empty()
    }

    /// Cached viewport state
    pub fn viewport(&self) -> ViewportState {
        self.inner.borrow().geometry.state()
    }

    pub fn context(&self) -> H::Context {
        self.inner.borrow().context.clone()
    }

    /// Throttle interval for scroll and resize events
    pub fn delay(&self) -> Duration {
        self.inner.borrow().scroll.delay()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }
}
