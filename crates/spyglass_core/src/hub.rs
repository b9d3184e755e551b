//! Per-context engine lookup
//!
//! [`SpyHub`] keeps one [`Spyglass`] per scroll context, created on first
//! use with the hub's instance options and engine-wide callback. Routing
//! calls take an optional context; `None` means the host's root context.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use spyglass_core::headless::HeadlessHost;
//! use spyglass_core::host::{Extent, Offset};
//! use spyglass_core::{SpyHub, SpyOptions};
//!
//! let host = Rc::new(HeadlessHost::new(1024.0, 768.0));
//! let panel = host.add_surface(Offset::new(100.0, 0.0), Extent::new(300.0, 200.0));
//! let a = host.add_node(Offset::new(50.0, 0.0), Extent::new(10.0, 10.0));
//! let b = host.add_node(Offset::new(150.0, 0.0), Extent::new(10.0, 10.0));
//!
//! let hub = SpyHub::new(Rc::clone(&host));
//! hub.spy([a], None, &SpyOptions::new(), None).unwrap();
//! hub.spy([b], None, &SpyOptions::new(), Some(panel)).unwrap();
//!
//! assert_eq!(hub.len(), 2);
//! assert!(hub.destroy(Some(panel)));
//! assert_eq!(hub.len(), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::SpyOptions;
use crate::error::Result;
use crate::host::Host;
use crate::registry::{SpyCallback, SpyId};
use crate::spyglass::Spyglass;

/// One spy engine per scroll context
pub struct SpyHub<H: Host> {
    host: Rc<H>,
    /// Instance options for engines created by this hub
    options: SpyOptions,
    callback: Option<SpyCallback<H::Element>>,
    /// Contexts are only `PartialEq`, so lookup is a scan
    engines: RefCell<Vec<Spyglass<H>>>,
}

impl<H: Host + 'static> SpyHub<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            options: SpyOptions::default(),
            callback: None,
            engines: RefCell::new(Vec::new()),
        }
    }

    /// Set the instance options for engines created from now on
    pub fn with_options(mut self, options: SpyOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the engine-wide callback for engines created from now on
    pub fn with_callback(mut self, callback: SpyCallback<H::Element>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Get the engine for a context, creating it if it doesn't exist
    ///
    /// Engines destroyed directly through their handle are replaced.
    pub fn engine(&self, context: Option<H::Context>) -> Result<Spyglass<H>> {
        let context = self.resolve_context(context);
        self.prune();
        if let Some(engine) = self.get(Some(context.clone())) {
            return Ok(engine);
        }

        let engine = Spyglass::new(
            Rc::clone(&self.host),
            context,
            self.options.clone(),
            self.callback.clone(),
        )?;
        self.engines.borrow_mut().push(engine.clone());
        Ok(engine)
    }

    /// Register elements with the engine for `context`
    pub fn spy<I>(
        &self,
        elements: I,
        callback: Option<SpyCallback<H::Element>>,
        options: &SpyOptions,
        context: Option<H::Context>,
    ) -> Result<Vec<SpyId>>
    where
        I: IntoIterator<Item = H::Element>,
    {
        self.engine(context)?.add(elements, callback, options)
    }

    /// Re-measure elements in `context`. Returns whether an engine exists.
    pub fn reload<I>(&self, elements: I, context: Option<H::Context>) -> bool
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<H::Element>,
    {
        match self.get(context) {
            Some(engine) => {
                engine.reload(elements);
                true
            }
            None => false,
        }
    }

    /// Deregister elements from `context`. Returns how many were registered.
    pub fn remove<I>(&self, elements: I, context: Option<H::Context>) -> usize
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<H::Element>,
    {
        self.get(context)
            .map(|engine| engine.remove(elements))
            .unwrap_or(0)
    }
}

impl<H: Host> SpyHub<H> {
    /// Get the live engine for a context if it exists, without creating
    pub fn get(&self, context: Option<H::Context>) -> Option<Spyglass<H>> {
        let context = self.resolve_context(context);
        self.engines
            .borrow()
            .iter()
            .find(|engine| !engine.is_destroyed() && engine.context() == context)
            .cloned()
    }

    /// Destroy and forget the engine for a context
    pub fn destroy(&self, context: Option<H::Context>) -> bool {
        let context = self.resolve_context(context);
        self.prune();
        let removed = {
            let mut engines = self.engines.borrow_mut();
            engines
                .iter()
                .position(|engine| engine.context() == context)
                .map(|index| engines.remove(index))
        };

        match removed {
            Some(engine) => {
                engine.destroy();
                debug!(context = ?context, "Destroyed spy engine");
                true
            }
            None => false,
        }
    }

    /// Destroy and forget every engine
    pub fn destroy_all(&self) {
        let engines = std::mem::take(&mut *self.engines.borrow_mut());
        debug!(engines = engines.len(), "Destroying all spy engines");
        for engine in engines {
            engine.destroy();
        }
    }

    /// Contexts that currently have a live engine, in creation order
    pub fn contexts(&self) -> Vec<H::Context> {
        self.engines
            .borrow()
            .iter()
            .filter(|e| !e.is_destroyed())
            .map(|e| e.context())
            .collect()
    }

    /// Number of live engines
    pub fn len(&self) -> usize {
        self.engines
            .borrow()
            .iter()
            .filter(|e| !e.is_destroyed())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget engines destroyed through their own handle
    fn prune(&self) {
        self.engines
            .borrow_mut()
            .retain(|engine| !engine.is_destroyed());
    }

    fn resolve_context(&self, context: Option<H::Context>) -> H::Context {
        context.unwrap_or_else(|| self.host.root_context())
    }
}

impl<H: Host> Drop for SpyHub<H> {
    fn drop(&mut self) {
        for engine in self.engines.get_mut().drain(..) {
            engine.destroy();
        }
    }
}
