//! Ownership-node protocol shared by every tracked container.
//!
//! # Overview
//!
//! Each tracked container owns its children and holds at most one *weak*
//! back-reference to the container that currently owns it. Mutating a node
//! sets its dirty flag and, on the Unchanged→Changed transition, notifies
//! the owner, which performs the identical transition on itself. The walk
//! continues synchronously until it reaches the root or an ancestor that is
//! already dirty, so the root's flag is accurate the moment any mutating
//! method returns.
//!
//! The dirty flag is append-only: the only way back to a clean state is
//! [`Trackable::fork`], which produces a *new* node. An original retained by
//! some other holder stays dirty.
//!
//! Ownership is tree-shaped. A node adopted into a second container simply
//! overwrites its parent link (last assignment wins); there is no
//! multi-parent fan-out.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value as Json;

use crate::list::ListInner;
use crate::map::MapInner;
use crate::record::RecordInner;

/// The capability every tracked container implements.
///
/// All operations are total: they cannot fail on any instance of a
/// well-formed ownership tree.
pub trait Trackable {
    /// True once any mutation has occurred since construction or the last
    /// [`fork`](Trackable::fork).
    fn is_changed(&self) -> bool;

    /// Sets the dirty flag. On the Unchanged→Changed transition the current
    /// owner is notified and transitions itself, recursively to the root.
    fn mark_changed(&self);

    /// Overwrites the parent link. Supports re-parenting; the previous link
    /// is abandoned, not merged or queued.
    fn set_parent(&self, parent: Parent);

    /// A non-owning handle to this node, suitable for storing as a child's
    /// parent link.
    fn as_parent(&self) -> Parent;

    /// Returns a new node of the same kind holding equivalent contents, with
    /// the dirty flag reset and the parent link cleared.
    ///
    /// The copy is shallow per level: children are deep-copied only if they
    /// are themselves dirty at fork time; clean children are re-adopted by
    /// the fork (their parent link moves, last wins).
    fn fork(&self) -> Self
    where
        Self: Sized;

    /// A plain, ownership-free representation. Tracked children are
    /// recursively converted; plain leaves are cloned as-is.
    fn view(&self) -> Json;
}

// ── Node bookkeeping ───────────────────────────────────────────────────────

/// Per-node state carried by every container's backing cell.
pub(crate) struct NodeMeta {
    pub(crate) changed: bool,
    pub(crate) parent: Option<ParentLink>,
}

impl NodeMeta {
    pub(crate) fn new() -> Self {
        Self {
            changed: false,
            parent: None,
        }
    }
}

pub(crate) trait HasMeta {
    fn meta_mut(&mut self) -> &mut NodeMeta;
}

// ── Parent link ────────────────────────────────────────────────────────────

/// Non-owning handle to a tracked container, used as a child's parent link.
///
/// The handle is weak: it never keeps its target alive, so ownership flows
/// strictly parent→child and no retention cycle can form through it.
#[derive(Clone)]
pub struct Parent {
    pub(crate) link: ParentLink,
}

#[derive(Clone)]
pub(crate) enum ParentLink {
    Record(Weak<RefCell<RecordInner>>),
    Map(Weak<RefCell<MapInner>>),
    List(Weak<RefCell<ListInner>>),
}

impl ParentLink {
    /// Marks the referenced node dirty. Returns the next link to walk when
    /// this call performed the Unchanged→Changed transition; `None` when the
    /// node is already dirty, is the root, or has been dropped.
    fn mark(&self) -> Option<ParentLink> {
        match self {
            ParentLink::Record(weak) => mark_cell(weak),
            ParentLink::Map(weak) => mark_cell(weak),
            ParentLink::List(weak) => mark_cell(weak),
        }
    }
}

fn mark_cell<T: HasMeta>(weak: &Weak<RefCell<T>>) -> Option<ParentLink> {
    let cell = weak.upgrade()?;
    let mut inner = cell.borrow_mut();
    let meta = inner.meta_mut();
    if meta.changed {
        return None;
    }
    meta.changed = true;
    meta.parent.clone()
}

/// Walks a parent chain, performing the Unchanged→Changed transition on
/// each ancestor until the root or an already-dirty node stops the walk.
///
/// A dirty child's current owner is always dirty (every adoption path
/// either marks the adopter or forks the child first), so stopping at a
/// dirty ancestor never leaves a stale clean flag above it.
pub(crate) fn propagate(start: Option<ParentLink>) {
    let mut next = start;
    while let Some(link) = next {
        next = link.mark();
    }
}

/// Shared implementation of [`Trackable::mark_changed`] for a container
/// cell: flips the local flag and returns the chain to propagate, if the
/// call performed the transition.
pub(crate) fn mark_meta(meta: &mut NodeMeta) -> Option<ParentLink> {
    let was_changed = meta.changed;
    meta.changed = true;
    if was_changed {
        None
    } else {
        meta.parent.clone()
    }
}
