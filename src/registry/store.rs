//! The scoped registry store: one head per object kind.
//!
//! A store has no notion of which scope it serves. The campaign keeps the single
//! global store behind a lock, and every worker owns one local store outright; the
//! scope-specific rules (locking, pruning after local inserts) live with those owners.

use rand_core::RngCore;

use crate::error::RegistryError;
use crate::primitives::{Handle, Object};
use crate::random::rnd_below;
use crate::registry::head::{Destructor, ObjectHead};
use crate::types::{ObjectId, ObjectKind, MAX_OBJECT_TYPES};

/// Runs `destroy` on a detached Object, then releases the Object itself.
pub(crate) fn release(id: ObjectId, obj: Object, destroy: Option<&Destructor>) {
    tracing::trace!(kind = %obj.kind(), %id, "destroying object");
    if let Some(destroy) = destroy {
        destroy.call(&obj);
    }
    drop(obj);
}

#[derive(Debug)]
pub struct ObjectStore {
    heads: [ObjectHead; MAX_OBJECT_TYPES],
    next_id: u64,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    /// An empty store with every kind unbounded and no destructors.
    pub fn new() -> Self {
        ObjectStore { heads: ObjectKind::ALL.map(ObjectHead::new), next_id: 0 }
    }

    /// An empty store whose heads copy the capacity and destructor of `template`'s heads.
    /// The copy is taken once; later changes to `template` are not seen.
    pub fn inherit(template: &ObjectStore) -> Self {
        ObjectStore { heads: ObjectKind::ALL.map(|kind| ObjectHead::inherit(template.head(kind))), next_id: 0 }
    }

    #[inline]
    pub fn head(&self, kind: ObjectKind) -> &ObjectHead {
        &self.heads[kind.index()]
    }

    #[inline]
    pub fn head_mut(&mut self, kind: ObjectKind) -> &mut ObjectHead {
        &mut self.heads[kind.index()]
    }

    pub fn heads(&self) -> impl Iterator<Item = &ObjectHead> + '_ {
        self.heads.iter()
    }

    pub fn objects_empty(&self, kind: ObjectKind) -> bool {
        self.head(kind).is_empty()
    }

    /// Live Objects across every kind.
    pub fn total_entries(&self) -> usize {
        self.heads.iter().map(ObjectHead::num_entries).sum()
    }

    /// Appends `obj` to the tail of its kind's list.
    ///
    /// Fails if a live Object already owns the same handle. The rejected Object is
    /// dropped without running a destructor, since its handle belongs to the live one.
    pub fn insert(&mut self, obj: Object) -> Result<ObjectId, RegistryError> {
        let kind = obj.kind();
        if let Some(handle) = obj.handle() {
            if let Some((owner_kind, owner)) = self.owner_of(handle) {
                tracing::debug!(%kind, %handle, %owner, "rejected aliasing object");
                return Err(RegistryError::HandleInUse(handle, owner_kind, owner));
            }
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.head_mut(kind).push_back(id, obj);
        tracing::trace!(%kind, %id, live = self.head(kind).num_entries(), "object added");
        Ok(id)
    }

    /// The live Object that owns `handle`, if any.
    pub fn owner_of(&self, handle: Handle) -> Option<(ObjectKind, ObjectId)> {
        self.heads.iter().find_map(|head| {
            head.iter().find(|(_, obj)| obj.handle() == Some(handle)).map(|(id, _)| (head.kind(), id))
        })
    }

    /// A uniformly chosen live Object of `kind`, or `None` if there are none.
    pub fn random_object<R: RngCore + ?Sized>(&self, kind: ObjectKind, rng: &mut R) -> Option<(ObjectId, &Object)> {
        let head = self.head(kind);
        let n = head.num_entries();
        if n == 0 {
            return None;
        }
        let i = rnd_below(rng, n as u32) as usize;
        head.nth(i)
    }

    pub fn get(&self, kind: ObjectKind, id: ObjectId) -> Option<&Object> {
        self.head(kind).iter().find(|(entry_id, _)| *entry_id == id).map(|(_, obj)| obj)
    }

    /// Detaches one Object without destroying it. The caller gets the Object together
    /// with the destructor it still has to run.
    pub fn take(&mut self, kind: ObjectKind, id: ObjectId) -> Option<(Object, Option<Destructor>)> {
        let head = self.head_mut(kind);
        let pos = head.position(id)?;
        let (_, obj) = head.remove_at(pos)?;
        Some((obj, head.destructor().cloned()))
    }

    /// Detaches every Object of `kind`, oldest first.
    pub fn take_all(&mut self, kind: ObjectKind) -> (Vec<(ObjectId, Object)>, Option<Destructor>) {
        let head = self.head_mut(kind);
        let taken: Vec<_> = head.drain().collect();
        (taken, head.destructor().cloned())
    }

    /// Detaches the Object, runs the kind's destructor on it and frees it.
    /// Returns false if no live Object of `kind` has this id.
    pub fn destroy(&mut self, kind: ObjectKind, id: ObjectId) -> bool {
        match self.take(kind, id) {
            Some((obj, destroy)) => {
                release(id, obj, destroy.as_ref());
                true
            }
            None => false,
        }
    }

    /// Destroys the Object at position `pos` of `kind`'s list.
    pub(crate) fn destroy_at(&mut self, kind: ObjectKind, pos: usize) -> Option<ObjectId> {
        let head = self.head_mut(kind);
        let (id, obj) = head.remove_at(pos)?;
        release(id, obj, head.destructor());
        Some(id)
    }

    /// Destroys every live Object of `kind`, oldest first. Returns how many were destroyed.
    pub fn destroy_all(&mut self, kind: ObjectKind) -> usize {
        if self.objects_empty(kind) {
            return 0;
        }
        let mut destroyed = 0;
        while self.destroy_at(kind, 0).is_some() {
            destroyed += 1;
        }
        destroyed
    }

    /// Destroys every live Object of every kind.
    pub fn destroy_everything(&mut self) -> usize {
        ObjectKind::ALL.iter().map(|kind| self.destroy_all(*kind)).sum()
    }

    /// One line per live Object of `kind`, preceded by a summary line.
    /// The lines are also emitted at `info` level. Nothing is modified.
    pub fn dump(&self, kind: ObjectKind) -> Vec<String> {
        let head = self.head(kind);
        let mut lines = Vec::with_capacity(head.num_entries() + 1);
        lines.push(format!("There are {} entries in the {} list.", head.num_entries(), kind));
        lines.extend(head.iter().map(|(_, obj)| obj.describe()));
        for line in &lines {
            tracing::info!("{}", line);
        }
        lines
    }
}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        let destroyed = self.destroy_everything();
        if destroyed > 0 {
            tracing::debug!(destroyed, "store dropped with live objects");
        }
    }
}
