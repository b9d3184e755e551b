//! Spyglass Core
//!
//! Scroll-spy engine: watches elements inside a scrollable viewport and fires
//! callbacks when an element enters or leaves a configurable trigger zone.
//!
//! # Features
//!
//! - **Trigger Zones**: Offset and size as pixels or percentages, negative
//!   values counting from the far edge
//! - **Overlap or Containment**: Any overlap counts as inside, or require the
//!   whole element to fit
//! - **Both Axes**: Vertical (`up`/`down`) or horizontal (`left`/`right`)
//! - **Throttled Events**: Scroll and resize handling with a trailing call
//! - **Host Agnostic**: Measurement, events and timers come from a [`Host`]
//! - **Headless Host**: In-memory host with a virtual clock for tests and
//!   scenario replay
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use spyglass_core::headless::HeadlessHost;
//! use spyglass_core::host::{Extent, Offset};
//! use spyglass_core::{SpyOptions, SpyRef, SpyState, Spyglass};
//!
//! let host = Rc::new(HeadlessHost::new(1024.0, 500.0));
//! let section = host.add_node(Offset::new(600.0, 0.0), Extent::new(1024.0, 100.0));
//!
//! let spyglass = Spyglass::new(Rc::clone(&host), host.root(), SpyOptions::new(), None).unwrap();
//! spyglass.add([section], None, &SpyOptions::new()).unwrap();
//! assert_eq!(spyglass.state(SpyRef::element(&section)), Some(SpyState::After));
//!
//! host.scroll_to(host.root(), 300.0, 0.0);
//! assert_eq!(spyglass.state(SpyRef::element(&section)), Some(SpyState::Inside));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod hub;
pub mod ratio;
pub mod registry;
pub mod spyglass;
pub mod throttle;

pub use config::{Axis, SpyConfig, SpyOptions, DEFAULT_DELAY_MS};
pub use engine::{evaluate, SpyEvent, SpyState, TriggerZone};
pub use error::{Result, SpyError};
pub use geometry::{ElementExtent, GeometryTracker, ViewportState};
pub use host::{
    Extent, Host, ListenerCallback, ListenerId, Offset, Scheduler, TimerCallback, TimerId,
    ViewportEvent,
};
pub use hub::SpyHub;
pub use ratio::{parse_ratio, Ratio, RatioSpec};
pub use registry::{SpyCallback, SpyId, SpyRecord, SpyRef, SpyRegistry};
pub use spyglass::{Spyglass, WeakSpyglass};
pub use throttle::Throttle;
