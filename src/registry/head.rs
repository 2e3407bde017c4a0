//! Registry heads: the per-(scope, kind) list of live Objects and its policy.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::primitives::Object;
use crate::types::{ObjectId, ObjectKind};

/// Per-kind callback that releases the OS resource behind an Object.
///
/// Cloning a `Destructor` copies the handle, not the head it came from: a local head
/// that copied the global destructor keeps it even if the global head is later
/// given a different one.
#[derive(Clone)]
pub struct Destructor(Arc<dyn Fn(&Object) + Send + Sync>);

impl Destructor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Object) + Send + Sync + 'static,
    {
        Destructor(Arc::new(f))
    }

    #[inline]
    pub fn call(&self, obj: &Object) {
        (self.0)(obj)
    }

    /// True if both handles refer to the same callback.
    pub fn same_as(&self, other: &Destructor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Destructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Destructor(..)")
    }
}

/// One list of live Objects of a single kind, plus its capacity and destructor.
///
/// Entries are kept in insertion order. The live count is the length of that list,
/// so it cannot drift from the number of Objects actually held.
#[derive(Debug)]
pub struct ObjectHead {
    kind: ObjectKind,
    entries: VecDeque<(ObjectId, Object)>,
    /// Soft capacity; 0 means never prune.
    max_entries: u32,
    destroy: Option<Destructor>,
}

impl ObjectHead {
    pub fn new(kind: ObjectKind) -> Self {
        ObjectHead { kind, entries: VecDeque::new(), max_entries: 0, destroy: None }
    }

    /// An empty head carrying `other`'s capacity and destructor.
    pub fn inherit(other: &ObjectHead) -> Self {
        ObjectHead {
            kind: other.kind,
            entries: VecDeque::new(),
            max_entries: other.max_entries,
            destroy: other.destroy.clone(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    #[inline]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> u32 {
        self.max_entries
    }

    pub fn set_max_entries(&mut self, max_entries: u32) {
        self.max_entries = max_entries;
    }

    pub fn destructor(&self) -> Option<&Destructor> {
        self.destroy.as_ref()
    }

    pub fn set_destructor(&mut self, destroy: Option<Destructor>) {
        self.destroy = destroy;
    }

    /// A bounded head that has reached its capacity. Only full heads are pruned.
    pub fn is_full(&self) -> bool {
        self.max_entries != 0 && self.entries.len() >= self.max_entries as usize
    }

    /// Live Objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
        self.entries.iter().map(|(id, obj)| (*id, obj))
    }

    pub(crate) fn push_back(&mut self, id: ObjectId, obj: Object) {
        debug_assert_eq!(obj.kind(), self.kind);
        self.entries.push_back((id, obj));
    }

    /// The `n`th live Object, counting from the oldest.
    pub(crate) fn nth(&self, n: usize) -> Option<(ObjectId, &Object)> {
        self.iter().nth(n)
    }

    pub(crate) fn position(&self, id: ObjectId) -> Option<usize> {
        self.entries.iter().position(|(entry_id, _)| *entry_id == id)
    }

    pub(crate) fn remove_at(&mut self, pos: usize) -> Option<(ObjectId, Object)> {
        self.entries.remove(pos)
    }

    pub(crate) fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, (ObjectId, Object)> {
        self.entries.drain(..)
    }
}
