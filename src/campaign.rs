//!
//! The campaign-wide shared state: the global object store and the worker slots.
//!
//! Synchronisation contract:
//! - The global store sits behind one mutex. Every resolve/mutate/count sequence on a
//!   global head happens under it.
//! - Destructors never run under that mutex. Objects are detached while locked and
//!   released after the guard is dropped.
//! - Local stores are owned by their `WorkerContext` and need no lock. The supervisor
//!   only touches a worker's store through `reap_worker`, which takes the worker by
//!   value and so cannot race with it.
//! - Nothing leaks on drop. A dropped worker destroys its local Objects, and a dropped
//!   campaign destroys whatever is still in the global store.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use rand_chacha::ChaCha8Rng;
use rand_core::RngCore;

use crate::config::CampaignConfig;
use crate::error::RegistryError;
use crate::os;
use crate::primitives::Object;
use crate::random::{os_seed, worker_rng, worker_seed};
use crate::registry::store::release;
use crate::registry::{Destructor, ObjectStore};
use crate::types::{ObjectId, ObjectKind};
use crate::worker::WorkerContext;

#[derive(Debug)]
pub struct Campaign {
    config: CampaignConfig,
    seed: u64,
    global: Mutex<ObjectStore>,
    /// Occupied worker slots.
    workers: Mutex<BTreeSet<u32>>,
}

impl Campaign {
    /// Builds the global store from `config`'s object policy.
    pub fn new(config: CampaignConfig) -> Arc<Self> {
        let seed = config.seed.unwrap_or_else(os_seed);
        let mut global = ObjectStore::new();
        for kind in ObjectKind::ALL {
            let head = global.head_mut(kind);
            head.set_max_entries(config.policy.limit(kind));
            if config.policy.os_destructors {
                head.set_destructor(os::default_destructor(kind));
            }
        }
        tracing::info!(seed, max_workers = config.max_workers, "campaign object registry initialised");
        Arc::new(Campaign { config, seed, global: Mutex::new(global), workers: Mutex::new(BTreeSet::new()) })
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Locks the global store. Callers must not run destructors while holding the guard.
    pub fn lock_global(&self) -> Result<MutexGuard<'_, ObjectStore>, RegistryError> {
        Ok(self.global.lock()?)
    }

    /// Adds `obj` to the global store. Global objects are never pruned.
    pub fn add_global(&self, obj: Object) -> Result<ObjectId, RegistryError> {
        self.lock_global()?.insert(obj)
    }

    /// Runs `f` on a uniformly chosen global Object of `kind` while the lock is held.
    /// Returns `Ok(None)` when the kind has no live Objects.
    pub fn with_random_global<R, F, T>(&self, kind: ObjectKind, rng: &mut R, f: F) -> Result<Option<T>, RegistryError>
    where
        R: RngCore + ?Sized,
        F: FnOnce(ObjectId, &Object) -> T,
    {
        let global = self.lock_global()?;
        Ok(global.random_object(kind, rng).map(|(id, obj)| f(id, obj)))
    }

    /// Destroys one global Object. The destructor runs after the lock is released.
    pub fn destroy_global(&self, kind: ObjectKind, id: ObjectId) -> Result<bool, RegistryError> {
        let taken = self.lock_global()?.take(kind, id);
        match taken {
            Some((obj, destroy)) => {
                release(id, obj, destroy.as_ref());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Destroys every global Object of `kind`.
    pub fn destroy_global_kind(&self, kind: ObjectKind) -> Result<usize, RegistryError> {
        let (taken, destroy) = {
            let mut global = self.lock_global()?;
            if global.objects_empty(kind) {
                return Ok(0);
            }
            global.take_all(kind)
        };
        let count = taken.len();
        for (id, obj) in taken {
            release(id, obj, destroy.as_ref());
        }
        Ok(count)
    }

    /// Campaign teardown: destroys every global Object. Local Objects are expected to be
    /// gone already, released when their workers were reaped.
    pub fn destroy_global_objects(&self) -> Result<usize, RegistryError> {
        let mut destroyed = 0;
        for kind in ObjectKind::ALL {
            destroyed += self.destroy_global_kind(kind)?;
        }
        tracing::info!(destroyed, "global objects destroyed");
        Ok(destroyed)
    }

    pub fn global_entries(&self, kind: ObjectKind) -> Result<usize, RegistryError> {
        Ok(self.lock_global()?.head(kind).num_entries())
    }

    pub fn objects_empty(&self, kind: ObjectKind) -> Result<bool, RegistryError> {
        Ok(self.lock_global()?.objects_empty(kind))
    }

    /// Changes a global capacity. Workers already running keep the value they copied.
    pub fn set_global_limit(&self, kind: ObjectKind, max_entries: u32) -> Result<(), RegistryError> {
        self.lock_global()?.head_mut(kind).set_max_entries(max_entries);
        Ok(())
    }

    /// Changes a global destructor. Workers already running keep the one they copied.
    pub fn set_global_destructor(&self, kind: ObjectKind, destroy: Option<Destructor>) -> Result<(), RegistryError> {
        self.lock_global()?.head_mut(kind).set_destructor(destroy);
        Ok(())
    }

    pub fn dump_global(&self, kind: ObjectKind) -> Result<Vec<String>, RegistryError> {
        Ok(self.lock_global()?.dump(kind))
    }

    /// Starts worker `num` with its deterministic per-worker generator.
    pub fn spawn_worker(self: &Arc<Self>, num: u32) -> Result<WorkerContext<ChaCha8Rng>, RegistryError> {
        let seed = worker_seed(self.seed, num);
        self.spawn_worker_with_rng(num, seed, worker_rng(seed))
    }

    /// Starts worker `num` with a caller-supplied generator.
    ///
    /// The new local store copies the global heads' capacity and destructor as they
    /// are right now.
    pub fn spawn_worker_with_rng<R: RngCore>(
        self: &Arc<Self>,
        num: u32,
        seed: u64,
        rng: R,
    ) -> Result<WorkerContext<R>, RegistryError> {
        if num >= self.config.max_workers {
            return Err(RegistryError::WorkerOutOfRange(num, self.config.max_workers));
        }
        if !self.workers.lock()?.insert(num) {
            return Err(RegistryError::WorkerSlotBusy(num));
        }
        let objects = match self.global.lock() {
            Ok(global) => ObjectStore::inherit(&global),
            Err(_) => {
                self.release_slot(num);
                return Err(RegistryError::LockPoisoned);
            }
        };
        tracing::info!(worker = num, seed, "worker started");
        Ok(WorkerContext::new(num, seed, rng, objects, Arc::clone(self)))
    }

    /// Tears down a worker that has stopped running: destroys all of its local Objects
    /// and frees its slot. Returns how many Objects were destroyed.
    ///
    /// Dropping the worker does the same teardown; reaping also reports the count.
    pub fn reap_worker<R: RngCore>(&self, mut worker: WorkerContext<R>) -> usize {
        let destroyed = worker.objects_mut().destroy_everything();
        tracing::info!(worker = worker.num(), destroyed, "worker reaped");
        destroyed
    }

    /// Slots currently occupied by workers.
    pub fn active_workers(&self) -> Result<Vec<u32>, RegistryError> {
        Ok(self.workers.lock()?.iter().copied().collect())
    }

    pub(crate) fn release_slot(&self, num: u32) {
        match self.workers.lock() {
            Ok(mut workers) => {
                workers.remove(&num);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&num);
            }
        }
    }
}
