//! trackable — change-tracked composite values with copy-on-write
//! publishing for single-threaded reduce loops.
//!
//! # Overview
//!
//! Consumers mutate nested composite values through an in-place API while
//! every previously published snapshot stays untouched. Each container
//! carries a dirty flag and a weak link to its current owner; a mutation
//! marks the container and walks the ownership tree to the root before the
//! mutating call returns. At the boundary of a state transition,
//! [`publish`](publish::publish) substitutes a fresh clean fork for a dirty
//! return value, so the clone cost is paid once per transition instead of
//! once per mutation.
//!
//! # Container kinds
//!
//! | Type                              | Semantics                              |
//! |-----------------------------------|----------------------------------------|
//! | [`record::TrackableRecord`]       | Keyed record with a fixed field set    |
//! | [`map::TrackableMap`]             | Associative map, insertion-ordered     |
//! | [`list::TrackableList`]           | Index-addressable ordered sequence     |
//!
//! All three store [`value::Value`]s: plain JSON leaves or further tracked
//! containers, nested arbitrarily deep. Ownership is tree-shaped — a node
//! adopted by a second container abandons its previous owner link.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use trackable::{tracked, Action, RecordTemplate, TrackableMap, Trackable, Value};
//!
//! let counter = RecordTemplate::new([("count", 0)]);
//! let state = TrackableMap::from_entries([("a", counter.create())]);
//!
//! let mut reduce = tracked(|state: Option<Value>, action: &Action| {
//!     let map = state.and_then(|s| s.as_map().cloned()).unwrap();
//!     if action.kind == "add" {
//!         let entry = map.get("a").unwrap();
//!         let record = entry.as_record().unwrap();
//!         record.update("count", |n| {
//!             Value::from(n.unwrap().view().as_i64().unwrap() + 1)
//!         });
//!     }
//!     Value::Map(map)
//! });
//!
//! // A mutating transition publishes a fresh, clean fork...
//! let s1 = reduce(Some(Value::Map(state.clone())), &Action::new("add"));
//! assert!(!s1.as_map().unwrap().ptr_eq(&state));
//! assert!(!s1.is_changed());
//! assert_eq!(s1.view(), json!({"a": {"count": 1}}));
//!
//! // ...while a transition that changes nothing passes identity through.
//! let s2 = reduce(Some(s1.clone()), &Action::new("noop"));
//! assert!(s2.as_map().unwrap().ptr_eq(s1.as_map().unwrap()));
//! ```

pub mod action;
pub mod error;
pub mod list;
pub mod map;
pub mod node;
pub mod publish;
pub mod record;
pub mod value;

pub use action::Action;
pub use error::TrackableError;
pub use list::TrackableList;
pub use map::TrackableMap;
pub use node::{Parent, Trackable};
pub use publish::{publish, tracked};
pub use record::{RecordTemplate, TrackableRecord};
pub use value::Value;
