//! Keyed record with a fixed field set.
//!
//! # Overview
//!
//! A [`RecordTemplate`] fixes a field-name set and a default value per
//! field; [`TrackableRecord`] instances are minted from it by merging the
//! defaults with an optional partial override set. The field-name set of an
//! instance is exactly the template's for its whole lifetime: `delete`
//! stores an absent sentinel instead of removing the name, and `set` with a
//! name outside the template is ignored.
//!
//! The absent sentinel is `None` at the storage layer, which keeps it
//! distinct from every legitimate stored value — including JSON `null`,
//! `false`, `0`, and `""`. `get_or` resolves to its default only on the
//! sentinel, never on a falsy value.
//!
//! Forking rebuilds from the template: a deleted field comes back as its
//! template default in the fork, not as an absent marker. Template defaults
//! that are themselves tracked containers are materialized per instance, so
//! no two instances (and never the template) share a mutable child.
//!
//! The per-field native property accessors of dynamically typed hosts are
//! deliberately not reproduced; the generic `get`/`set` pair is the whole
//! field interface.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::debug;

use crate::error::TrackableError;
use crate::node::{
    mark_meta, propagate, HasMeta, NodeMeta, Parent, ParentLink, Trackable,
};
use crate::value::{adopt, ingest, Value};

// ── Template ───────────────────────────────────────────────────────────────

/// Shape template: field names with per-field default values.
///
/// Cloning the handle shares the underlying template; every record minted
/// from it keeps a reference for fork-time rebuilding.
#[derive(Clone)]
pub struct RecordTemplate {
    defaults: Rc<IndexMap<String, Value>>,
}

impl RecordTemplate {
    /// Defines a template from field defaults, in iteration order.
    pub fn new<I, K, V>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let defaults = defaults
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            defaults: Rc::new(defaults),
        }
    }

    /// Defines a template from a plain JSON object of defaults.
    ///
    /// Anything but an object is a precondition violation and fails fast.
    pub fn try_from_json(json: Json) -> Result<Self, TrackableError> {
        match json {
            Json::Object(object) => Ok(Self::new(
                object.into_iter().map(|(key, value)| (key, Value::Json(value))),
            )),
            _ => Err(TrackableError::NotObject),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.defaults.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    pub fn default_of(&self, key: &str) -> Option<Value> {
        self.defaults.get(key).cloned()
    }

    /// Mints a record holding every field's default.
    pub fn create(&self) -> TrackableRecord {
        self.create_with(std::iter::empty::<(&str, Value)>())
    }

    /// Mints a record by merging the defaults with `overrides`.
    ///
    /// Override keys outside the template are ignored; inbound tracked
    /// values go through copy-on-write ingestion.
    pub fn create_with<I, K, V>(&self, overrides: I) -> TrackableRecord
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let record = TrackableRecord {
            inner: Rc::new(RefCell::new(RecordInner {
                meta: NodeMeta::new(),
                template: self.clone(),
                fields: IndexMap::new(),
            })),
        };
        let parent = record.as_parent();
        for (key, default) in self.defaults.iter() {
            let value = adopt(materialize_default(default), &parent);
            record
                .inner
                .borrow_mut()
                .fields
                .insert(key.clone(), Some(value));
        }
        for (key, value) in overrides {
            let key = key.into();
            if !self.contains(&key) {
                debug!(%key, "override outside the record's field set ignored");
                continue;
            }
            let value = ingest(value.into(), &parent);
            record.inner.borrow_mut().fields.insert(key, Some(value));
        }
        record
    }
}

/// A tracked default is copied per instance so the template never shares a
/// mutable child with the records minted from it.
fn materialize_default(default: &Value) -> Value {
    match default {
        Value::Json(json) => Value::Json(json.clone()),
        Value::Record(record) => Value::Record(record.fork()),
        Value::Map(map) => Value::Map(map.fork()),
        Value::List(list) => Value::List(list.fork()),
    }
}

// ── Record ─────────────────────────────────────────────────────────────────

pub(crate) struct RecordInner {
    pub(crate) meta: NodeMeta,
    pub(crate) template: RecordTemplate,
    /// `None` is the absent sentinel left behind by `delete`.
    pub(crate) fields: IndexMap<String, Option<Value>>,
}

impl HasMeta for RecordInner {
    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }
}

/// Tracked keyed record. Cloning the handle aliases the same node.
#[derive(Clone)]
pub struct TrackableRecord {
    pub(crate) inner: Rc<RefCell<RecordInner>>,
}

enum SetOutcome {
    Effective,
    Identical,
    UnknownKey,
}

impl TrackableRecord {
    /// True when both handles alias the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The template this record was minted from.
    pub fn template(&self) -> RecordTemplate {
        self.inner.borrow().template.clone()
    }

    /// Field names, in template order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().fields.keys().cloned().collect()
    }

    /// True when `key` currently holds the absent sentinel.
    pub fn is_absent(&self, key: &str) -> bool {
        matches!(self.inner.borrow().fields.get(key), Some(None))
    }

    /// The stored value; `None` for an absent field or a name outside the
    /// template.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().fields.get(key).cloned().flatten()
    }

    /// Like [`get`](Self::get), but resolves the absent sentinel to
    /// `default`. A stored falsy value (`null`, `false`, `0`, `""`) is
    /// returned as stored.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Stores `value` under `key`.
    ///
    /// No-op when the stored value is identity-equal to `value`, or when
    /// `key` is outside the template's field set.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> &Self {
        let value = value.into();
        let outcome = {
            let inner = self.inner.borrow();
            if !inner.template.contains(key) {
                SetOutcome::UnknownKey
            } else if matches!(inner.fields.get(key), Some(Some(stored)) if stored.same(&value)) {
                SetOutcome::Identical
            } else {
                SetOutcome::Effective
            }
        };
        match outcome {
            SetOutcome::UnknownKey => {
                debug!(%key, "set outside the record's field set ignored");
            }
            SetOutcome::Identical => {}
            SetOutcome::Effective => {
                let value = adopt(value, &self.as_parent());
                self.inner
                    .borrow_mut()
                    .fields
                    .insert(key.to_string(), Some(value));
                self.mark_changed();
            }
        }
        self
    }

    /// Replaces the field with `mutator(current)`; the mutator receives
    /// `None` on an absent field.
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
            self.set(&key.into(), value);
        }
        self
    }

    /// Replaces the stored value with the absent sentinel. The field name
    /// stays part of the record. No-op when the field is already absent or
    /// outside the template.
    pub fn delete(&self, key: &str) -> &Self {
        let effective = {
            let mut inner = self.inner.borrow_mut();
            match inner.fields.get_mut(key) {
                Some(slot) if slot.is_some() => {
                    *slot = None;
                    true
                }
                _ => false,
            }
        };
        if effective {
            self.mark_changed();
        }
        self
    }

    /// Shallow snapshot: every field in template order; `None` marks an
    /// absent field, stored values come back as-is.
    pub fn entries(&self) -> Vec<(String, Option<Value>)> {
        self.inner
            .borrow()
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl Trackable for TrackableRecord {
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
            link: ParentLink::Record(Rc::downgrade(&self.inner)),
        }
    }

    /// Rebuilds from the template merged with the currently present fields:
    /// a deleted field reverts to its template default in the fork.
    fn fork(&self) -> Self {
        let (template, staged) = {
            let inner = self.inner.borrow();
            let staged: Vec<(String, Value)> = inner
                .template
                .defaults
                .iter()
                .map(|(key, default)| {
                    let value = match inner.fields.get(key) {
                        Some(Some(stored)) => stored.clone(),
                        _ => materialize_default(default),
                    };
                    (key.clone(), value)
                })
                .collect();
            (inner.template.clone(), staged)
        };
        let record = TrackableRecord {
            inner: Rc::new(RefCell::new(RecordInner {
                meta: NodeMeta::new(),
                template,
                fields: IndexMap::new(),
            })),
        };
        let parent = record.as_parent();
        for (key, value) in staged {
            let value = ingest(value, &parent);
            record.inner.borrow_mut().fields.insert(key, Some(value));
        }
        record
    }

    /// Absent fields are omitted from the plain representation.
    fn view(&self) -> Json {
        let mut object = serde_json::Map::new();
        for (key, value) in self.entries() {
            if let Some(value) = value {
                object.insert(key, value.view());
            }
        }
        Json::Object(object)
    }
}

impl std::fmt::Debug for TrackableRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackableRecord")
            .field("changed", &self.is_changed())
            .field("view", &self.view())
            .finish()
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
