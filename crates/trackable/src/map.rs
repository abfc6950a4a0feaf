//! Associative map with dynamic string keys.
//!
//! # Overview
//!
//! [`TrackableMap`] wraps an insertion-ordered map of string keys to
//! [`Value`]s. Mutation semantics are unordered, but iteration and the
//! plain [`view`](Trackable::view) preserve insertion order.
//!
//! Every mutating method follows the shared rule: decide first whether the
//! call actually changes observable contents, and only then touch storage,
//! flip the dirty flag, and adopt inserted children. Insertion applies
//! copy-on-write ingestion — a dirty inbound child is forked before it is
//! stored, so its prior change epoch never leaks into this map.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::error::TrackableError;
use crate::node::{
    mark_meta, propagate, HasMeta, NodeMeta, Parent, ParentLink, Trackable,
};
use crate::value::{ingest, Value};

pub(crate) struct MapInner {
    pub(crate) meta: NodeMeta,
    pub(crate) entries: IndexMap<String, Value>,
}

impl HasMeta for MapInner {
    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }
}

/// Tracked associative map. Cloning the handle aliases the same node.
#[derive(Clone)]
pub struct TrackableMap {
    pub(crate) inner: Rc<RefCell<MapInner>>,
}

impl TrackableMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapInner {
                meta: NodeMeta::new(),
                entries: IndexMap::new(),
            })),
        }
    }

    /// Builds a map from key/value entries, in iteration order.
    ///
    /// Inbound tracked values go through copy-on-write ingestion: dirty ones
    /// are forked, clean ones are re-parented into this map.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = Self::new();
        let parent = map.as_parent();
        for (key, value) in entries {
            let value = ingest(value.into(), &parent);
            map.inner.borrow_mut().entries.insert(key.into(), value);
        }
        map
    }

    /// Builds a map from a plain JSON object. Nested aggregates stay plain.
    ///
    /// Anything but an object is a precondition violation and fails fast.
    pub fn try_from_json(json: Json) -> Result<Self, TrackableError> {
        match json {
            Json::Object(object) => Ok(Self::from_entries(
                object.into_iter().map(|(key, value)| (key, Value::Json(value))),
            )),
            _ => Err(TrackableError::NotObject),
        }
    }

    /// True when both handles alias the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Like [`get`](Self::get), but resolves a missing key to `default`.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Stores `value` under `key`.
    ///
    /// No-op when the stored value is identity-equal to `value` — the dirty
    /// flag stays untouched and no owner is notified.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        let key = key.into();
        let value = value.into();
        let unchanged = {
            let inner = self.inner.borrow();
            matches!(inner.entries.get(&key), Some(stored) if stored.same(&value))
        };
        if unchanged {
            return self;
        }
        let value = ingest(value, &self.as_parent());
        self.inner.borrow_mut().entries.insert(key, value);
        self.mark_changed();
        self
    }

    /// Replaces the value under `key` with `mutator(current)`; the mutator
    /// receives `None` when the key is missing.
    pub fn update(&self, key: &str, mutator: impl FnOnce(Option<Value>) -> Value) -> &Self {
        let next = mutator(self.get(key));
        self.set(key, next)
    }

    /// Applies [`set`](Self::set) for every entry, in input order. Later
    /// duplicate keys overwrite earlier ones.
    pub fn merge<I, K, V>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
        self
    }

    /// Removes `key`. No-op when the key is missing.
    pub fn delete(&self, key: &str) -> &Self {
        let removed = self.inner.borrow_mut().entries.shift_remove(key).is_some();
        if removed {
            self.mark_changed();
        }
        self
    }

    /// Removes every entry. No-op on an empty map.
    pub fn clear(&self) {
        let emptied = {
            let mut inner = self.inner.borrow_mut();
            if inner.entries.is_empty() {
                false
            } else {
                inner.entries.clear();
                true
            }
        };
        if emptied {
            self.mark_changed();
        }
    }

    // ── Read-only accessors ───────────────────────────────────────────────

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.inner.borrow().entries.values().cloned().collect()
    }

    /// Shallow snapshot: the entries in insertion order, stored values
    /// returned as-is (tracked children stay live handles).
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Builds a fresh *clean* map by transforming every value.
    pub fn map_values(&self, mut f: impl FnMut(&str, &Value) -> Value) -> TrackableMap {
        let staged: Vec<(String, Value)> = self
            .entries()
            .into_iter()
            .map(|(key, value)| {
                let mapped = f(&key, &value);
                (key, mapped)
            })
            .collect();
        TrackableMap::from_entries(staged)
    }

    /// Builds a fresh *clean* map keeping only entries the predicate accepts.
    pub fn filter(&self, mut pred: impl FnMut(&str, &Value) -> bool) -> TrackableMap {
        let staged: Vec<(String, Value)> = self
            .entries()
            .into_iter()
            .filter(|(key, value)| pred(key, value))
            .collect();
        TrackableMap::from_entries(staged)
    }
}

impl Default for TrackableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackable for TrackableMap {
    fn is_changed(&self) -> bool {
        self.inner.borrow().meta.changed
    }

    fn mark_changed(&self) {
        let chain = mark_meta(&mut self.inner.borrow_mut().meta);
        propagate(chain);
    }

    fn set_parent(&self, parent: Parent) {
        self.inner.borrow_mut().meta.parent = Some(parent.link);
    }

    fn as_parent(&self) -> Parent {
        Parent {
            link: ParentLink::Map(Rc::downgrade(&self.inner)),
        }
    }

    fn fork(&self) -> Self {
        TrackableMap::from_entries(self.entries())
    }

    fn view(&self) -> Json {
        let mut object = serde_json::Map::new();
        for (key, value) in self.entries() {
            object.insert(key, value.view());
        }
        Json::Object(object)
    }
}

impl std::fmt::Debug for TrackableMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackableMap")
            .field("changed", &self.is_changed())
            .field("view", &self.view())
            .finish()
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
