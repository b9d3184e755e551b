//! Spy registry
//!
//! Maps spy ids to their records, in registration order. Ids are assigned
//! as `s0`, `s1`, ... and are never reused within one registry.
//!
//! Lookup by element is a linear scan over the live records. Spy counts are
//! small, and elements only need `PartialEq`, so there is no reverse index.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::SpyConfig;
use crate::engine::{SpyEvent, SpyState};
use crate::geometry::ElementExtent;

/// Callback invoked when a spy changes state
///
/// Uses Rc since dispatch happens on the event loop thread.
pub type SpyCallback<E> = Rc<dyn Fn(&SpyEvent<E>)>;

/// Unique identifier of a spy within one engine
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpyId(String);

impl SpyId {
    fn from_index(index: u64) -> Self {
        SpyId(format!("s{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SpyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A registered element with its configuration and last known state
pub struct SpyRecord<E> {
    id: SpyId,
    element: E,
    callback: Option<SpyCallback<E>>,
    config: SpyConfig,
    /// Measured span, `None` until loaded or when measurement failed
    pub(crate) extent: Option<ElementExtent>,
    /// Last dispatched state, `None` before the first check
    pub(crate) state: Option<SpyState>,
}

impl<E> SpyRecord<E> {
    pub fn id(&self) -> &SpyId {
        &self.id
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn callback(&self) -> Option<&SpyCallback<E>> {
        self.callback.as_ref()
    }

    pub fn config(&self) -> &SpyConfig {
        &self.config
    }

    pub fn extent(&self) -> Option<ElementExtent> {
        self.extent
    }

    pub fn state(&self) -> Option<SpyState> {
        self.state
    }
}

impl<E: fmt::Debug> fmt::Debug for SpyRecord<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyRecord")
            .field("id", &self.id)
            .field("element", &self.element)
            .field("has_callback", &self.callback.is_some())
            .field("config", &self.config)
            .field("extent", &self.extent)
            .field("state", &self.state)
            .finish()
    }
}

/// Anything that can identify a spy
pub enum SpyRef<'a, E> {
    /// A spy id
    Id(&'a str),
    /// A record obtained from the registry
    Record(&'a SpyRecord<E>),
    /// The watched element itself
    Element(&'a E),
}

impl<'a, E> SpyRef<'a, E> {
    pub fn element(element: &'a E) -> Self {
        SpyRef::Element(element)
    }
}

impl<'a, E> Clone for SpyRef<'a, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, E> Copy for SpyRef<'a, E> {}

impl<'a, E> From<&'a SpyId> for SpyRef<'a, E> {
    fn from(id: &'a SpyId) -> Self {
        SpyRef::Id(id.as_str())
    }
}

impl<'a, E> From<&'a str> for SpyRef<'a, E> {
    fn from(id: &'a str) -> Self {
        SpyRef::Id(id)
    }
}

impl<'a, E> From<&'a SpyRecord<E>> for SpyRef<'a, E> {
    fn from(record: &'a SpyRecord<E>) -> Self {
        SpyRef::Record(record)
    }
}

/// The set of spies owned by one engine
pub struct SpyRegistry<E> {
    spies: IndexMap<SpyId, SpyRecord<E>>,
    next_index: u64,
}

impl<E> Default for SpyRegistry<E> {
    fn default() -> Self {
        Self {
            spies: IndexMap::new(),
            next_index: 0,
        }
    }
}

impl<E: PartialEq> SpyRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element, or re-register it if already present
    ///
    /// Re-registering keeps the id and position, replaces the callback and
    /// configuration, and forgets the measured extent and last state.
    pub fn insert(
        &mut self,
        element: E,
        callback: Option<SpyCallback<E>>,
        config: SpyConfig,
    ) -> SpyId {
        if let Some(id) = self.resolve_id(SpyRef::Element(&element)) {
            if let Some(record) = self.spies.get_mut(&id) {
                record.callback = callback;
                record.config = config;
                record.extent = None;
                record.state = None;
            }
            return id;
        }

        let id = SpyId::from_index(self.next_index);
        self.next_index += 1;

        self.spies.insert(
            id.clone(),
            SpyRecord {
                id: id.clone(),
                element,
                callback,
                config,
                extent: None,
                state: None,
            },
        );
        id
    }

    /// Canonical id of a spy, or `None` if it is not registered
    pub fn resolve_id(&self, target: SpyRef<'_, E>) -> Option<SpyId> {
        match target {
            SpyRef::Id(id) => self.spies.get_key_value(id).map(|(id, _)| id.clone()),
            SpyRef::Record(record) => self
                .spies
                .contains_key(record.id())
                .then(|| record.id().clone()),
            SpyRef::Element(element) => self
                .spies
                .values()
                .find(|record| record.element == *element)
                .map(|record| record.id.clone()),
        }
    }

    /// Deregister a spy, returning its record if it was present
    pub fn remove(&mut self, target: SpyRef<'_, E>) -> Option<SpyRecord<E>> {
        let id = self.resolve_id(target)?;
        self.spies.shift_remove(&id)
    }
}

impl<E> SpyRegistry<E> {
    pub fn get(&self, id: &str) -> Option<&SpyRecord<E>> {
        self.spies.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SpyRecord<E>> {
        self.spies.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.spies.contains_key(id)
    }

    /// Snapshot of live ids in registration order
    pub fn ids(&self) -> Vec<SpyId> {
        self.spies.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpyRecord<E>> {
        self.spies.values()
    }

    pub fn len(&self) -> usize {
        self.spies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spies.is_empty()
    }

    pub fn clear(&mut self) {
        self.spies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpyOptions;
    use std::cell::Cell;

    fn config() -> SpyConfig {
        SpyConfig::default()
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = SpyRegistry::new();

        assert_eq!(registry.insert("a", None, config()).as_str(), "s0");
        assert_eq!(registry.insert("b", None, config()).as_str(), "s1");
        assert_eq!(registry.insert("c", None, config()).as_str(), "s2");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_reinsert_updates_in_place() {
        let mut registry = SpyRegistry::new();
        let first = registry.insert("a", None, config());
        registry.insert("b", None, config());

        if let Some(record) = registry.get_mut(first.as_str()) {
            record.state = Some(SpyState::Inside);
        }

        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let callback: SpyCallback<&str> =
            Rc::new(move |_: &SpyEvent<&str>| counter.set(counter.get() + 1));
        let again = registry.insert(
            "a",
            Some(callback),
            SpyConfig::resolve([&SpyOptions::new().contain(true)]),
        );

        assert_eq!(again, first);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec![first.clone(), SpyId::from_index(1)]);

        let record = registry.get(first.as_str()).unwrap();
        assert!(record.callback().is_some());
        assert!(record.config().contain);
        assert_eq!(record.state(), None);
    }

    #[test]
    fn test_resolve_id_variants() {
        let mut registry = SpyRegistry::new();
        let id = registry.insert("a", None, config());

        assert_eq!(registry.resolve_id(SpyRef::Id("s0")), Some(id.clone()));
        assert_eq!(registry.resolve_id((&id).into()), Some(id.clone()));
        assert_eq!(registry.resolve_id(SpyRef::element(&"a")), Some(id.clone()));

        let record = registry.get(id.as_str()).unwrap();
        assert_eq!(registry.resolve_id(record.into()), Some(id.clone()));

        assert_eq!(registry.resolve_id(SpyRef::Id("s9")), None);
        assert_eq!(registry.resolve_id(SpyRef::element(&"zzz")), None);
    }

    #[test]
    fn test_remove_keeps_order_and_never_reuses_ids() {
        let mut registry = SpyRegistry::new();
        registry.insert("a", None, config());
        registry.insert("b", None, config());
        registry.insert("c", None, config());

        let removed = registry.remove(SpyRef::element(&"b"));
        assert_eq!(removed.map(|r| r.id().clone()), Some(SpyId::from_index(1)));

        let ids: Vec<String> = registry.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["s0", "s2"]);

        assert_eq!(registry.insert("b", None, config()).as_str(), "s3");
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry: SpyRegistry<&str> = SpyRegistry::new();
        assert!(registry.remove(SpyRef::Id("s0")).is_none());
        assert!(registry.remove(SpyRef::element(&"x")).is_none());
        assert!(registry.is_empty());
    }
}
