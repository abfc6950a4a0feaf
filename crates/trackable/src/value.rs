//! Dynamic value type stored by every tracked container.
//!
//! # Overview
//!
//! A [`Value`] is either a plain JSON leaf or a handle to one of the three
//! tracked container kinds. Handles are reference-counted; cloning a handle
//! aliases the same node, so two `Value`s can refer to one container the way
//! two references do in a dynamically typed host.
//!
//! | Variant           | Contents                                  |
//! |-------------------|-------------------------------------------|
//! | `Value::Json`     | null, bool, number, string, plain array/object |
//! | `Value::Record`   | keyed record with a fixed field set       |
//! | `Value::Map`      | associative map, insertion-ordered        |
//! | `Value::List`     | index-addressable ordered sequence        |

use serde_json::Value as Json;
use tracing::trace;

use crate::list::TrackableList;
use crate::map::TrackableMap;
use crate::node::{Parent, Trackable};
use crate::record::TrackableRecord;

/// A plain JSON leaf or a tracked container handle.
#[derive(Debug, Clone)]
pub enum Value {
    /// Plain, untracked JSON. Nested plain aggregates stay plain; they are
    /// never converted into tracked containers implicitly.
    Json(Json),
    Record(TrackableRecord),
    Map(TrackableMap),
    List(TrackableList),
}

impl Value {
    /// True when this value is a tracked container handle.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, Value::Json(_))
    }

    /// Dirty flag of the underlying node; always false for plain leaves.
    pub fn is_changed(&self) -> bool {
        match self {
            Value::Json(_) => false,
            Value::Record(record) => record.is_changed(),
            Value::Map(map) => map.is_changed(),
            Value::List(list) => list.is_changed(),
        }
    }

    /// Identity equality, the comparison behind the mutation no-op rule.
    ///
    /// Tracked handles compare by pointer: two handles are the same only if
    /// they alias one node. Plain leaves compare by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Plain, ownership-free representation. Tracked containers are
    /// converted recursively; plain leaves are cloned as-is.
    pub fn view(&self) -> Json {
        match self {
            Value::Json(json) => json.clone(),
            Value::Record(record) => record.view(),
            Value::Map(map) => map.view(),
            Value::List(list) => list.view(),
        }
    }

    pub fn as_record(&self) -> Option<&TrackableRecord> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&TrackableMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TrackableList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Value::Json(json) => Some(json),
            _ => None,
        }
    }
}

// ── Adoption ───────────────────────────────────────────────────────────────

/// Adopts `value` into `parent` without copy-on-write: a tracked value is
/// re-parented (silently detached from any previous owner), a plain leaf
/// passes through.
pub(crate) fn adopt(value: Value, parent: &Parent) -> Value {
    match &value {
        Value::Json(_) => {}
        Value::Record(record) => record.set_parent(parent.clone()),
        Value::Map(map) => map.set_parent(parent.clone()),
        Value::List(list) => list.set_parent(parent.clone()),
    }
    value
}

/// Copy-on-write ingestion: like [`adopt`], but an inbound tracked value
/// whose dirty flag is already set is forked first, and the fork is what
/// gets adopted and stored.
///
/// This keeps a change epoch exclusive to one owner: a dirty child released
/// by one container can never retroactively mark a second container that
/// picked it up.
pub(crate) fn ingest(value: Value, parent: &Parent) -> Value {
    let value = match value {
        Value::Record(record) if record.is_changed() => {
            trace!("forking dirty record before adoption");
            Value::Record(record.fork())
        }
        Value::Map(map) if map.is_changed() => {
            trace!("forking dirty map before adoption");
            Value::Map(map.fork())
        }
        Value::List(list) if list.is_changed() => {
            trace!("forking dirty list before adoption");
            Value::List(list.fork())
        }
        other => other,
    };
    adopt(value, parent)
}

// ── Conversions ────────────────────────────────────────────────────────────

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::Json(json)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Json(Json::Bool(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Json(Json::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Json(Json::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Json(Json::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Json(Json::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Json(Json::String(v.to_string()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Json(Json::String(v))
    }
}

impl From<TrackableRecord> for Value {
    fn from(record: TrackableRecord) -> Self {
        Value::Record(record)
    }
}

impl From<TrackableMap> for Value {
    fn from(map: TrackableMap) -> Self {
        Value::Map(map)
    }
}

impl From<TrackableList> for Value {
    fn from(list: TrackableList) -> Self {
        Value::List(list)
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
