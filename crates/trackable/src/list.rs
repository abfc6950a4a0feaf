//! Index-addressable ordered sequence.
//!
//! # Overview
//!
//! [`TrackableList`] wraps a vector of [`Value`]s. Index access is
//! bounds-safe: reads past the end resolve to a caller-supplied default and
//! writes past the end are well-defined no-ops — growth goes through the
//! end-mutation operations. Splice ranges accept negative (from-the-end)
//! start positions and are clamped, never rejected.
//!
//! The numeric-property accessor materialization of dynamically typed hosts
//! (pre-registering index slots so bracket syntax routes through `get`/`set`)
//! is unnecessary here: ordinary indexed access already runs the tracking
//! logic, so no such mechanism exists in this implementation.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use serde_json::Value as Json;
use tracing::trace;

use crate::error::TrackableError;
use crate::node::{
    mark_meta, propagate, HasMeta, NodeMeta, Parent, ParentLink, Trackable,
};
use crate::value::{ingest, Value};

pub(crate) struct ListInner {
    pub(crate) meta: NodeMeta,
    pub(crate) items: Vec<Value>,
}

impl HasMeta for ListInner {
    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }
}

/// Tracked ordered sequence. Cloning the handle aliases the same node.
#[derive(Clone)]
pub struct TrackableList {
    pub(crate) inner: Rc<RefCell<ListInner>>,
}

impl TrackableList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListInner {
                meta: NodeMeta::new(),
                items: Vec::new(),
            })),
        }
    }

    /// Builds a list from values, in iteration order, with copy-on-write
    /// ingestion of tracked children.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Self::new();
        let parent = list.as_parent();
        for value in values {
            let value = ingest(value.into(), &parent);
            list.inner.borrow_mut().items.push(value);
        }
        list
    }

    /// Builds a list from a plain JSON array. Nested aggregates stay plain.
    ///
    /// Anything but an array is a precondition violation and fails fast.
    pub fn try_from_json(json: Json) -> Result<Self, TrackableError> {
        match json {
            Json::Array(items) => Ok(Self::from_values(items.into_iter().map(Value::Json))),
            _ => Err(TrackableError::NotArray),
        }
    }

    /// True when both handles alias the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Like [`get`](Self::get), but resolves an out-of-range index to
    /// `default`.
    pub fn get_or(&self, index: usize, default: impl Into<Value>) -> Value {
        self.get(index).unwrap_or_else(|| default.into())
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Replaces the value at `index`.
    ///
    /// No-op when `index` is past the end or the stored value is
    /// identity-equal to `value`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> &Self {
        let value = value.into();
        let unchanged = {
            let inner = self.inner.borrow();
            match inner.items.get(index) {
                Some(stored) => stored.same(&value),
                None => {
                    trace!(index, len = inner.items.len(), "set past bounds ignored");
                    true
                }
            }
        };
        if unchanged {
            return self;
        }
        let value = ingest(value, &self.as_parent());
        self.inner.borrow_mut().items[index] = value;
        self.mark_changed();
        self
    }

    /// Appends one value. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let value = ingest(value.into(), &self.as_parent());
        let len = {
            let mut inner = self.inner.borrow_mut();
            inner.items.push(value);
            inner.items.len()
        };
        self.mark_changed();
        len
    }

    /// Appends every value in `values`. Returns the new length; a no-op on
    /// empty input.
    pub fn extend<I, V>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let parent = self.as_parent();
        let staged: Vec<Value> = values
            .into_iter()
            .map(|value| ingest(value.into(), &parent))
            .collect();
        if staged.is_empty() {
            return self.len();
        }
        let len = {
            let mut inner = self.inner.borrow_mut();
            inner.items.extend(staged);
            inner.items.len()
        };
        self.mark_changed();
        len
    }

    /// Prepends one value. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let value = ingest(value.into(), &self.as_parent());
        let len = {
            let mut inner = self.inner.borrow_mut();
            inner.items.insert(0, value);
            inner.items.len()
        };
        self.mark_changed();
        len
    }

    /// Removes and returns the last value. No-op on an empty list.
    pub fn pop(&self) -> Option<Value> {
        let value = self.inner.borrow_mut().items.pop();
        if value.is_some() {
            self.mark_changed();
        }
        value
    }

    /// Removes and returns the first value. No-op on an empty list.
    pub fn shift(&self) -> Option<Value> {
        let value = {
            let mut inner = self.inner.borrow_mut();
            if inner.items.is_empty() {
                None
            } else {
                Some(inner.items.remove(0))
            }
        };
        if value.is_some() {
            self.mark_changed();
        }
        value
    }

    /// Removes `delete_count` values at `start` and inserts `items` there.
    /// Returns the removed values.
    ///
    /// A negative `start` counts from the end; both the start and the delete
    /// count are clamped to the current length. The call is a no-op when
    /// nothing is removed and nothing is inserted.
    pub fn splice<I, V>(&self, start: isize, delete_count: usize, items: I) -> Vec<Value>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let len = self.len();
        let start = resolve_index(start, len);
        let delete = delete_count.min(len - start);
        let staged: Vec<Value> = items.into_iter().map(Into::into).collect();
        if delete == 0 && staged.is_empty() {
            return Vec::new();
        }
        let parent = self.as_parent();
        let staged: Vec<Value> = staged
            .into_iter()
            .map(|value| ingest(value, &parent))
            .collect();
        let removed: Vec<Value> = {
            let mut inner = self.inner.borrow_mut();
            inner.items.splice(start..start + delete, staged).collect()
        };
        self.mark_changed();
        removed
    }

    /// Reverses the list in place. No-op when the reversal cannot change
    /// observable contents.
    pub fn reverse(&self) -> &Self {
        let effective = {
            let inner = self.inner.borrow();
            inner.items.len() > 1 && !is_mirrored(&inner.items)
        };
        if effective {
            self.inner.borrow_mut().items.reverse();
            self.mark_changed();
        }
        self
    }

    /// Sorts the list in place with `compare` (stable). No-op when the
    /// resulting order is identical.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) -> &Self {
        let mut staged = self.to_vec();
        staged.sort_by(compare);
        let reordered = {
            let inner = self.inner.borrow();
            staged
                .iter()
                .zip(inner.items.iter())
                .any(|(a, b)| !a.same(b))
        };
        if reordered {
            self.inner.borrow_mut().items = staged;
            self.mark_changed();
        }
        self
    }

    /// Copies the `start..end` region onto `target`, clamped to the current
    /// length. Negative positions count from the end. No-op when every
    /// destination slot already holds an identity-equal value.
    pub fn copy_within(&self, target: isize, start: isize, end: Option<isize>) -> &Self {
        let len = self.len();
        let target = resolve_index(target, len);
        let start = resolve_index(start, len);
        let end = end.map_or(len, |e| resolve_index(e, len));
        let count = end.saturating_sub(start).min(len - target);
        if count == 0 {
            return self;
        }
        let (effective, source) = {
            let inner = self.inner.borrow();
            let source: Vec<Value> = inner.items[start..start + count].to_vec();
            let effective = source
                .iter()
                .zip(&inner.items[target..target + count])
                .any(|(a, b)| !a.same(b));
            (effective, source)
        };
        if effective {
            let mut inner = self.inner.borrow_mut();
            for (offset, value) in source.into_iter().enumerate() {
                inner.items[target + offset] = value;
            }
            drop(inner);
            self.mark_changed();
        }
        self
    }

    /// Overwrites the `start..end` region with `value`, clamped. No-op when
    /// every slot already holds an identity-equal value.
    pub fn fill(&self, value: impl Into<Value>, start: isize, end: Option<isize>) -> &Self {
        let len = self.len();
        let start = resolve_index(start, len);
        let end = end.map_or(len, |e| resolve_index(e, len));
        if start >= end {
            return self;
        }
        let value = value.into();
        let effective = {
            let inner = self.inner.borrow();
            inner.items[start..end].iter().any(|stored| !stored.same(&value))
        };
        if !effective {
            return self;
        }
        let value = ingest(value, &self.as_parent());
        {
            let mut inner = self.inner.borrow_mut();
            for slot in &mut inner.items[start..end] {
                *slot = value.clone();
            }
        }
        self.mark_changed();
        self
    }

    // ── Read-only derivations ─────────────────────────────────────────────

    /// Shallow snapshot of the whole list; stored values returned as-is.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.borrow().items.clone()
    }

    /// Copies the given range, clamped to the current length.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Vec<Value> {
        let inner = self.inner.borrow();
        let len = inner.items.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Vec::new();
        }
        inner.items[start..end].to_vec()
    }

    /// This list's values followed by `other`'s, as a plain vector.
    pub fn concat(&self, other: &TrackableList) -> Vec<Value> {
        let mut combined = self.to_vec();
        combined.extend(other.to_vec());
        combined
    }

    /// Index of the first value identity-equal to `value`.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.inner
            .borrow()
            .items
            .iter()
            .position(|stored| stored.same(value))
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    /// First value accepted by the predicate.
    pub fn find(&self, mut pred: impl FnMut(&Value) -> bool) -> Option<Value> {
        self.to_vec().into_iter().find(|value| pred(value))
    }

    /// Index of the first value accepted by the predicate.
    pub fn position(&self, mut pred: impl FnMut(&Value) -> bool) -> Option<usize> {
        self.to_vec().iter().position(|value| pred(value))
    }

    /// Left fold over the values.
    pub fn fold<A>(&self, init: A, mut f: impl FnMut(A, &Value) -> A) -> A {
        self.to_vec().iter().fold(init, |acc, value| f(acc, value))
    }
}

impl Default for TrackableList {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackable for TrackableList {
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
            link: ParentLink::List(Rc::downgrade(&self.inner)),
        }
    }

    fn fork(&self) -> Self {
        TrackableList::from_values(self.to_vec())
    }

    fn view(&self) -> Json {
        Json::Array(self.to_vec().iter().map(Value::view).collect())
    }
}

impl std::fmt::Debug for TrackableList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackableList")
            .field("changed", &self.is_changed())
            .field("view", &self.view())
            .finish()
    }
}

fn resolve_index(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

fn is_mirrored(items: &[Value]) -> bool {
    let len = items.len();
    (0..len / 2).all(|i| items[i].same(&items[len - 1 - i]))
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(values: &[i64]) -> TrackableList {
        TrackableList::from_values(values.iter().copied())
    }

    // ── Construction ──────────────────────────────────────────────────────

    #[test]
    fn constructs_from_values() {
        let list = numbers(&[1]);

        assert_eq!(list.get(0).unwrap().view(), json!(1));
        assert!(!list.is_changed());
    }

    #[test]
    fn constructs_from_plain_array() {
        let list = TrackableList::try_from_json(json!([1, [2, 3]])).unwrap();

        assert_eq!(list.view(), json!([1, [2, 3]]));
        assert!(!list.get(1).unwrap().is_tracked());
    }

    #[test]
    fn rejects_non_array_input() {
        assert_eq!(
            TrackableList::try_from_json(json!({"a": 1})),
            Err(TrackableError::NotArray)
        );
    }

    // ── get / set ─────────────────────────────────────────────────────────

    #[test]
    fn set_replaces_and_marks_changed() {
        let list = numbers(&[1]);

        list.set(0, 2);

        assert_eq!(list.get(0).unwrap().view(), json!(2));
        assert!(list.is_changed());
    }

    #[test]
    fn set_with_identical_value_is_a_noop() {
        let list = numbers(&[1]);

        list.set(0, 1);

        assert!(!list.is_changed());
    }

    #[test]
    fn set_past_bounds_is_a_noop() {
        let list = numbers(&[1]);

        list.set(5, 9);

        assert!(!list.is_changed());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn get_or_resolves_out_of_range_to_default() {
        let list = numbers(&[1]);

        assert_eq!(list.get_or(7, 42).view(), json!(42));
        assert!(list.get(7).is_none());
    }

    // ── End mutation ──────────────────────────────────────────────────────

    #[test]
    fn push_returns_new_length() {
        let list = numbers(&[1]);

        let len = list.push(2);

        assert_eq!(len, 2);
        assert!(list.is_changed());
        assert_eq!(list.view(), json!([1, 2]));
    }

    #[test]
    fn extend_appends_all_values() {
        let list = numbers(&[1]);

        let len = list.extend([2, 3]);

        assert_eq!(len, 3);
        assert_eq!(list.view(), json!([1, 2, 3]));
    }

    #[test]
    fn extend_with_nothing_is_a_noop() {
        let list = numbers(&[1]);

        let len = list.extend(Vec::<Value>::new());

        assert_eq!(len, 1);
        assert!(!list.is_changed());
    }

    #[test]
    fn unshift_prepends() {
        let list = numbers(&[1]);

        let len = list.unshift(0);

        assert_eq!(len, 2);
        assert_eq!(list.view(), json!([0, 1]));
        assert!(list.is_changed());
    }

    #[test]
    fn pop_removes_last() {
        let list = numbers(&[1, 2]);

        let value = list.pop().unwrap();

        assert_eq!(value.view(), json!(2));
        assert_eq!(list.view(), json!([1]));
        assert!(list.is_changed());
    }

    #[test]
    fn pop_on_empty_is_a_noop() {
        let list = TrackableList::new();

        assert!(list.pop().is_none());
        assert!(!list.is_changed());
    }

    #[test]
    fn shift_removes_first() {
        let list = numbers(&[1, 2]);

        let value = list.shift().unwrap();

        assert_eq!(value.view(), json!(1));
        assert_eq!(list.view(), json!([2]));
        assert!(list.is_changed());
    }

    #[test]
    fn shift_on_empty_is_a_noop() {
        let list = TrackableList::new();

        assert!(list.shift().is_none());
        assert!(!list.is_changed());
    }

    // ── splice ────────────────────────────────────────────────────────────

    #[test]
    fn splice_removes_a_middle_value() {
        let list = numbers(&[1, 2, 3]);

        let removed = list.splice(1, 1, Vec::<Value>::new());

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].view(), json!(2));
        assert_eq!(list.view(), json!([1, 3]));
        assert!(list.is_changed());
    }

    #[test]
    fn splice_inserts_without_removing() {
        let list = numbers(&[1, 3]);

        let removed = list.splice(1, 0, [Value::from(1.25), Value::from(1.5)]);

        assert!(removed.is_empty());
        assert_eq!(list.view(), json!([1, 1.25, 1.5, 3]));
    }

    #[test]
    fn splice_clamps_out_of_range_requests() {
        let list = numbers(&[1, 2, 3]);

        let removed = list.splice(10, 5, Vec::<Value>::new());

        assert!(removed.is_empty());
        assert!(!list.is_changed());
        assert_eq!(list.view(), json!([1, 2, 3]));
    }

    #[test]
    fn splice_accepts_negative_start() {
        let list = numbers(&[1, 2, 3]);

        let removed = list.splice(-1, 1, Vec::<Value>::new());

        assert_eq!(removed[0].view(), json!(3));
        assert_eq!(list.view(), json!([1, 2]));
    }

    // ── Reorder ───────────────────────────────────────────────────────────

    #[test]
    fn reverse_flips_order() {
        let list = numbers(&[1, 2, 3]);

        list.reverse();

        assert_eq!(list.view(), json!([3, 2, 1]));
        assert!(list.is_changed());
    }

    #[test]
    fn reverse_of_mirrored_contents_is_a_noop() {
        let single = numbers(&[1]);
        single.reverse();
        assert!(!single.is_changed());

        let palindrome = numbers(&[1, 2, 1]);
        palindrome.reverse();
        assert!(!palindrome.is_changed());
    }

    #[test]
    fn sort_by_reorders() {
        let list = numbers(&[3, 1, 2]);

        list.sort_by(|a, b| {
            a.view()
                .as_i64()
                .unwrap()
                .cmp(&b.view().as_i64().unwrap())
        });

        assert_eq!(list.view(), json!([1, 2, 3]));
        assert!(list.is_changed());
    }

    #[test]
    fn sort_of_sorted_list_is_a_noop() {
        let list = numbers(&[1, 2, 3]);

        list.sort_by(|a, b| {
            a.view()
                .as_i64()
                .unwrap()
                .cmp(&b.view().as_i64().unwrap())
        });

        assert!(!list.is_changed());
    }

    #[test]
    fn copy_within_copies_the_region() {
        let list = numbers(&[1, 2, 3, 4, 5]);

        list.copy_within(0, 3, None);

        assert_eq!(list.view(), json!([4, 5, 3, 4, 5]));
        assert!(list.is_changed());
    }

    #[test]
    fn copy_within_onto_identical_region_is_a_noop() {
        let list = numbers(&[1, 1, 1]);

        list.copy_within(0, 1, None);

        assert!(!list.is_changed());
    }

    #[test]
    fn fill_overwrites_the_range() {
        let list = numbers(&[1, 2, 3]);

        list.fill(0, 1, None);

        assert_eq!(list.view(), json!([1, 0, 0]));
        assert!(list.is_changed());
    }

    #[test]
    fn fill_with_identical_values_is_a_noop() {
        let list = numbers(&[7, 7]);

        list.fill(7, 0, None);

        assert!(!list.is_changed());
    }

    #[test]
    fn fill_on_empty_is_a_noop() {
        let list = TrackableList::new();

        list.fill(1, 0, None);

        assert!(!list.is_changed());
    }

    // ── Read-only derivations ─────────────────────────────────────────────

    #[test]
    fn slice_clamps_to_length() {
        let list = numbers(&[1, 2, 3]);

        let all: Vec<Json> = list.slice(..).iter().map(Value::view).collect();
        let tail: Vec<Json> = list.slice(1..10).iter().map(Value::view).collect();

        assert_eq!(all, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(tail, vec![json!(2), json!(3)]);
        assert!(list.slice(5..).is_empty());
    }

    #[test]
    fn concat_joins_without_mutating() {
        let left = numbers(&[1]);
        let right = numbers(&[2]);

        let combined = left.concat(&right);

        assert_eq!(combined.len(), 2);
        assert!(!left.is_changed());
        assert!(!right.is_changed());
    }

    #[test]
    fn index_of_searches_by_identity() {
        let child = crate::map::TrackableMap::new();
        let child_value = Value::Map(child.clone());
        let list = TrackableList::from_values([Value::from(1), child_value.clone()]);

        assert_eq!(list.index_of(&Value::from(1)), Some(0));
        assert_eq!(list.index_of(&child_value), Some(1));
        assert_eq!(list.index_of(&Value::from(9)), None);
    }

    #[test]
    fn fold_accumulates() {
        let list = numbers(&[1, 2, 3]);

        let total = list.fold(0i64, |acc, value| acc + value.view().as_i64().unwrap());

        assert_eq!(total, 6);
        assert!(!list.is_changed());
    }

    // ── Ownership ─────────────────────────────────────────────────────────

    #[test]
    fn child_mutation_marks_the_list() {
        let child = numbers(&[1]);
        let list = TrackableList::from_values([child.clone()]);

        child.set(0, 2);

        assert!(child.is_changed());
        assert!(list.is_changed());
    }

    #[test]
    fn push_forks_dirty_inbound_value() {
        let child = numbers(&[1]);
        child.set(0, 2);

        let list = TrackableList::new();
        list.push(child.clone());
        list.inner.borrow_mut().meta.changed = false;

        child.set(0, 3);

        assert!(!list.is_changed());
        assert_eq!(list.view(), json!([[2]]));
    }

    #[test]
    fn fork_is_clean_and_independent() {
        let list = numbers(&[1]);
        list.push(2);

        let fork = list.fork();
        list.push(3);
        fork.push(4);

        assert!(!fork.ptr_eq(&list));
        assert_eq!(list.view(), json!([1, 2, 3]));
        assert_eq!(fork.view(), json!([1, 2, 4]));
    }
}
