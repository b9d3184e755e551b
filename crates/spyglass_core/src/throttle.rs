//! Leading and trailing edge throttle
//!
//! Wraps a handler so that it runs at most once per `delay`. A call arriving
//! inside the window is not dropped: it replaces any previously deferred call
//! and runs when the window closes, so the most recent arguments always win.
//!
//! Deferred runs are scheduled through the host [`Scheduler`]. Dropping the
//! last clone of a throttle cancels its pending timer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::host::{Scheduler, TimerId};

struct ThrottleState {
    /// When the handler last ran, `None` before the first run
    last_run: Option<Duration>,
    /// Deferred run waiting on the scheduler
    pending: Option<TimerId>,
}

struct ThrottleInner<S: Scheduler, A> {
    scheduler: Rc<S>,
    delay: Duration,
    handler: Box<dyn Fn(A)>,
    state: RefCell<ThrottleState>,
}

impl<S: Scheduler, A> ThrottleInner<S, A> {
    fn run(&self, args: A) {
        {
            let mut state = self.state.borrow_mut();
            state.last_run = Some(self.scheduler.now());
            state.pending = None;
        }
        (self.handler)(args);
    }

    fn clear(&self) {
        let pending = self.state.borrow_mut().pending.take();
        if let Some(id) = pending {
            self.scheduler.clear_timeout(id);
        }
    }
}

impl<S: Scheduler, A> Drop for ThrottleInner<S, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// A rate-limited handler (cheap to clone)
pub struct Throttle<S: Scheduler, A> {
    inner: Rc<ThrottleInner<S, A>>,
}

impl<S: Scheduler, A> Clone for Throttle<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Scheduler + 'static, A: 'static> Throttle<S, A> {
    /// Wrap `handler` so it runs at most once per `delay`
    pub fn new<F>(scheduler: Rc<S>, delay: Duration, handler: F) -> Self
    where
        F: Fn(A) + 'static,
    {
        Self {
            inner: Rc::new(ThrottleInner {
                scheduler,
                delay,
                handler: Box::new(handler),
                state: RefCell::new(ThrottleState {
                    last_run: None,
                    pending: None,
                }),
            }),
        }
    }

    /// Invoke the throttled handler
    ///
    /// Runs immediately if more than `delay` has elapsed since the last run,
    /// otherwise defers to the end of the window, replacing any deferred
    /// call that is still waiting.
    pub fn call(&self, args: A) {
        let inner = &self.inner;
        let now = inner.scheduler.now();
        let elapsed = inner
            .state
            .borrow()
            .last_run
            .map(|last| now.saturating_sub(last));

        inner.clear();

        match elapsed {
            Some(elapsed) if elapsed <= inner.delay => {
                let weak: Weak<ThrottleInner<S, A>> = Rc::downgrade(inner);
                let id = inner.scheduler.set_timeout(
                    inner.delay - elapsed,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.run(args);
                        }
                    }),
                );
                inner.state.borrow_mut().pending = Some(id);
            }
            _ => inner.run(args),
        }
    }
}

impl<S: Scheduler, A> Throttle<S, A> {
    /// Drop the deferred call, if any
    pub fn cancel(&self) {
        self.inner.clear();
    }

    /// Whether a deferred call is waiting
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().pending.is_some()
    }

    /// Length of the throttle window
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}
