//! # External lookup table for read-side queries.
//!
//! When a parent is initialized with `registry = true` it maintains a
//! [`Lookup`] — a concurrent map from [`ChildId`] to the child's current
//! pid and meta. The handle can be cloned into any task, letting readers
//! answer `child_pid` / `child_meta` queries without a round trip through
//! the parent's inbox.
//!
//! ## Rules
//! - **Single writer**: only the parent mutates the table.
//! - **Lagging reads**: a reader may observe a snapshot slightly behind the
//!   parent's own registry, but never a torn record.
//! - Only children that carry an id appear; anonymous children are not
//!   externally addressable.

use std::sync::Arc;

use dashmap::DashMap;

use crate::children::{ChildId, ChildPid};

/// One reader-visible record.
#[derive(Debug, Clone)]
pub struct ChildSnapshot<M> {
    /// Current runtime handle of the child.
    pub pid: ChildPid,
    /// Current user annotation of the child.
    pub meta: M,
}

/// Cloneable read-side handle onto the parent's children.
pub struct Lookup<M> {
    map: Arc<DashMap<ChildId, ChildSnapshot<M>>>,
}

impl<M> Clone for Lookup<M> {
    fn clone(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
        }
    }
}

impl<M: Clone> Lookup<M> {
    pub(crate) fn new() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
        }
    }

    /// Returns the pid currently registered for `id`.
    pub fn child_pid(&self, id: impl Into<ChildId>) -> Option<ChildPid> {
        self.map.get(&id.into()).map(|entry| entry.pid)
    }

    /// Returns the meta currently registered for `id`.
    pub fn child_meta(&self, id: impl Into<ChildId>) -> Option<M> {
        self.map.get(&id.into()).map(|entry| entry.meta.clone())
    }

    /// Whether a live child is registered under `id`.
    pub fn contains(&self, id: impl Into<ChildId>) -> bool {
        self.map.contains_key(&id.into())
    }

    /// Number of id-carrying live children.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn insert(&self, id: ChildId, pid: ChildPid, meta: M) {
        self.map.insert(id, ChildSnapshot { pid, meta });
    }

    pub(crate) fn remove(&self, id: &ChildId) {
        self.map.remove(id);
    }

    pub(crate) fn clear(&self) {
        self.map.clear();
    }
}
