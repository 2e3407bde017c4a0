//! The worker control block: a worker's identity, its generator and its local store.
//!
//! Every registry call a worker makes goes through its own `WorkerContext`, so
//! "the current worker" is always explicit.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rand_core::RngCore;

use crate::campaign::Campaign;
use crate::error::RegistryError;
use crate::primitives::Object;
use crate::registry::{prune_objects, ObjectHead, ObjectStore};
use crate::types::{ObjectId, ObjectKind, Scope};

pub struct WorkerContext<R: RngCore = ChaCha8Rng> {
    num: u32,
    seed: u64,
    rng: R,
    objects: ObjectStore,
    campaign: Arc<Campaign>,
}

impl<R: RngCore> WorkerContext<R> {
    pub(crate) fn new(num: u32, seed: u64, rng: R, objects: ObjectStore, campaign: Arc<Campaign>) -> Self {
        WorkerContext { num, seed, rng, objects, campaign }
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn campaign(&self) -> &Arc<Campaign> {
        &self.campaign
    }

    /// The worker's local store.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub(crate) fn objects_mut(&mut self) -> &mut ObjectStore {
        &mut self.objects
    }

    /// Overrides the capacity this worker copied from the global head.
    pub fn set_local_limit(&mut self, kind: ObjectKind, max_entries: u32) {
        self.objects.head_mut(kind).set_max_entries(max_entries);
    }

    /// Tracks a newly acquired resource.
    ///
    /// A local insertion is followed by a pruning pass over the whole local store,
    /// which may evict Objects of any kind, including the one just added. Global
    /// insertions never prune.
    pub fn add_object(&mut self, obj: Object, scope: Scope) -> Result<ObjectId, RegistryError> {
        match scope {
            Scope::Global => self.campaign.add_global(obj),
            Scope::Local => {
                let id = self.objects.insert(obj)?;
                prune_objects(&mut self.objects, &mut self.rng);
                Ok(id)
            }
        }
    }

    /// Resolves the head for `(scope, kind)` and runs `f` on it.
    pub fn with_head<F, T>(&self, scope: Scope, kind: ObjectKind, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&ObjectHead) -> T,
    {
        match scope {
            Scope::Global => Ok(f(self.campaign.lock_global()?.head(kind))),
            Scope::Local => Ok(f(self.objects.head(kind))),
        }
    }

    pub fn num_entries(&self, scope: Scope, kind: ObjectKind) -> Result<usize, RegistryError> {
        self.with_head(scope, kind, ObjectHead::num_entries)
    }

    /// A uniformly chosen local Object of `kind`.
    pub fn random_local(&mut self, kind: ObjectKind) -> Option<(ObjectId, &Object)> {
        self.objects.random_object(kind, &mut self.rng)
    }

    /// Runs `f` on a uniformly chosen Object of `kind` in `scope`, or returns `Ok(None)`
    /// when there is none. For the global scope `f` runs under the global lock.
    pub fn with_random_object<F, T>(&mut self, kind: ObjectKind, scope: Scope, f: F) -> Result<Option<T>, RegistryError>
    where
        F: FnOnce(ObjectId, &Object) -> T,
    {
        match scope {
            Scope::Global => self.campaign.with_random_global(kind, &mut self.rng, f),
            Scope::Local => Ok(self.objects.random_object(kind, &mut self.rng).map(|(id, obj)| f(id, obj))),
        }
    }

    /// Destroys one Object. Returns false if `id` is not live in that head.
    pub fn destroy_object(&mut self, scope: Scope, kind: ObjectKind, id: ObjectId) -> Result<bool, RegistryError> {
        match scope {
            Scope::Global => self.campaign.destroy_global(kind, id),
            Scope::Local => Ok(self.objects.destroy(kind, id)),
        }
    }

    /// Destroys every Object of `kind` in `scope`.
    pub fn destroy_objects(&mut self, scope: Scope, kind: ObjectKind) -> Result<usize, RegistryError> {
        match scope {
            Scope::Global => self.campaign.destroy_global_kind(kind),
            Scope::Local => Ok(self.objects.destroy_all(kind)),
        }
    }

    pub fn dump_objects(&self, scope: Scope, kind: ObjectKind) -> Result<Vec<String>, RegistryError> {
        match scope {
            Scope::Global => self.campaign.dump_global(kind),
            Scope::Local => Ok(self.objects.dump(kind)),
        }
    }
}

impl<R: RngCore> std::fmt::Debug for WorkerContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("num", &self.num)
            .field("seed", &self.seed)
            .field("objects", &self.objects.total_entries())
            .finish()
    }
}

/// A worker that goes away without being reaped still releases everything it holds:
/// its local Objects are destroyed before the slot is freed.
impl<R: RngCore> Drop for WorkerContext<R> {
    fn drop(&mut self) {
        let destroyed = self.objects.destroy_everything();
        if destroyed > 0 {
            tracing::info!(worker = self.num, destroyed, "unreaped worker dropped");
        }
        self.campaign.release_slot(self.num);
    }
}
