//! Publish-time clone decision.
//!
//! # Overview
//!
//! A transition function mutates the current state in place through the
//! container API and returns it. Before that return value becomes the new
//! externally visible snapshot, [`publish`] inspects it: a tracked value
//! whose dirty flag is set is replaced by a fresh, clean fork, so holders
//! of the previous snapshot keep an unmodified view. Everything else —
//! clean tracked values and plain values alike — passes through untouched.
//!
//! [`tracked`] wraps a transition function so every return goes through
//! this decision. It is the single place where "mutate freely inside a
//! transition, publish immutably outside it" is enforced.

use tracing::{debug, trace};

use crate::action::Action;
use crate::node::Trackable;
use crate::value::Value;

/// Applies the clone decision to a transition function's return value.
pub fn publish(next: Value) -> Value {
    match next {
        Value::Record(record) if record.is_changed() => {
            debug!("dirty record at the publish boundary; substituting a fork");
            Value::Record(record.fork())
        }
        Value::Map(map) if map.is_changed() => {
            debug!("dirty map at the publish boundary; substituting a fork");
            Value::Map(map.fork())
        }
        Value::List(list) if list.is_changed() => {
            debug!("dirty list at the publish boundary; substituting a fork");
            Value::List(list.fork())
        }
        other => {
            trace!("clean value at the publish boundary; passing through");
            other
        }
    }
}

/// Wraps a transition function so its every return value passes through
/// [`publish`] before becoming the new snapshot.
///
/// The state argument is `None` on the first invocation.
pub fn tracked<F>(mut transition: F) -> impl FnMut(Option<Value>, &Action) -> Value
where
    F: FnMut(Option<Value>, &Action) -> Value,
{
    move |state, action| publish(transition(state, action))
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TrackableMap;
    use serde_json::json;

    #[test]
    fn clean_tracked_value_passes_through_by_identity() {
        let map = TrackableMap::from_entries([("a", 1)]);

        let published = publish(Value::Map(map.clone()));

        assert!(published.as_map().unwrap().ptr_eq(&map));
    }

    #[test]
    fn dirty_tracked_value_is_replaced_by_a_clean_fork() {
        let map = TrackableMap::new();
        map.set("a", 1);

        let published = publish(Value::Map(map.clone()));

        let published = published.as_map().unwrap();
        assert!(!published.ptr_eq(&map));
        assert!(!published.is_changed());
        assert_eq!(published.view(), json!({"a": 1}));
    }

    #[test]
    fn plain_values_pass_through() {
        let published = publish(Value::from(json!({"a": 1})));

        assert_eq!(published.view(), json!({"a": 1}));
        assert!(!published.is_tracked());
    }

    #[test]
    fn tracked_wraps_a_transition_function() {
        let mut reduce = tracked(|state: Option<Value>, action: &Action| {
            let map = match state {
                Some(Value::Map(map)) => map,
                _ => TrackableMap::new(),
            };
            if action.kind == "set" {
                map.set("k", action.payload.clone());
            }
            Value::Map(map)
        });

        let first = reduce(None, &Action::new("noop"));
        let first_map = first.as_map().unwrap().clone();

        let second = reduce(Some(first), &Action::with_payload("set", json!(1)));
        let second_map = second.as_map().unwrap();

        assert!(!second_map.ptr_eq(&first_map));
        assert!(!second_map.is_changed());
        assert_eq!(second_map.view(), json!({"k": 1}));
        // The superseded working state keeps its dirty flag; only the
        // published fork starts a fresh epoch.
        assert!(first_map.is_changed());
    }
}
