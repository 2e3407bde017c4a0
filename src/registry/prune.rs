//! Randomised eviction for worker-local stores.
//!
//! A poor man's garbage collector: it keeps a long-running worker from exhausting
//! descriptor tables or address space without making eviction predictable. Bounds
//! are soft. A list may grow past its capacity for a while; a later pass trims it.

use rand_core::RngCore;

use crate::random::{one_in, rand_bool, rnd_below};
use crate::registry::store::ObjectStore;
use crate::types::ObjectKind;

/// Chance (1 in N) that an insertion runs a pruning pass at all.
pub const PRUNE_PASS_ONE_IN: u32 = 10;

/// Chance (1 in N) that a visited Object is evicted during a scan.
pub const EVICT_ONE_IN: u32 = 10;

/// Runs after every local insertion. Most calls return immediately; otherwise every
/// kind is considered in turn. Returns how many Objects were destroyed.
pub fn prune_objects<R: RngCore + ?Sized>(store: &mut ObjectStore, rng: &mut R) -> usize {
    if !one_in(rng, PRUNE_PASS_ONE_IN) {
        return 0;
    }
    ObjectKind::ALL.iter().map(|kind| prune_kind(store, *kind, rng)).sum()
}

/// Evicts a random number of Objects from `kind`'s list if it is bounded and full.
pub fn prune_kind<R: RngCore + ?Sized>(store: &mut ObjectStore, kind: ObjectKind, rng: &mut R) -> usize {
    if rand_bool(rng) {
        return 0;
    }

    let head = store.head(kind);
    // 0 = don't ever prune.
    if head.max_entries() == 0 {
        return 0;
    }
    if !head.is_full() {
        return 0;
    }

    let live = head.num_entries();
    let mut to_prune = rnd_below(rng, live as u32) as usize;
    let target = to_prune;

    while to_prune > 0 {
        let mut pos = 0;
        while pos < store.head(kind).num_entries() && to_prune > 0 {
            if one_in(rng, EVICT_ONE_IN) {
                if let Some(id) = store.destroy_at(kind, pos) {
                    tracing::debug!(%kind, %id, "pruned object");
                    to_prune -= 1;
                }
            } else {
                pos += 1;
            }
        }
    }

    if target > 0 {
        tracing::debug!(%kind, pruned = target, live = store.head(kind).num_entries(), "prune pass done");
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Object;
    use crate::testing::SequenceRng;

    fn store_with_pipes(count: i32, max: u32) -> ObjectStore {
        let mut store = ObjectStore::new();
        store.head_mut(ObjectKind::FdPipe).set_max_entries(max);
        for fd in 0..count {
            store.insert(Object::Pipe(fd)).unwrap();
        }
        store
    }

    #[test]
    fn test_outer_gate_skips_most_passes() {
        let mut store = store_with_pipes(10, 5);
        // 1 % 10 != 0: the pass never starts.
        let mut rng = SequenceRng::new(vec![1]);
        assert_eq!(prune_objects(&mut store, &mut rng), 0);
        assert_eq!(store.head(ObjectKind::FdPipe).num_entries(), 10);
    }

    #[test]
    fn test_coin_flip_skips_kind() {
        let mut store = store_with_pipes(10, 5);
        let mut rng = SequenceRng::new(vec![1]);
        assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 0);
        assert_eq!(store.head(ObjectKind::FdPipe).num_entries(), 10);
    }

    #[test]
    fn test_unbounded_kind_never_pruned() {
        let mut store = store_with_pipes(50, 0);
        let mut rng = SequenceRng::new(vec![0]);
        for _ in 0..20 {
            assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 0);
        }
        assert_eq!(store.head(ObjectKind::FdPipe).num_entries(), 50);
    }

    #[test]
    fn test_list_below_capacity_not_pruned() {
        let mut store = store_with_pipes(4, 5);
        let mut rng = SequenceRng::new(vec![0]);
        assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 0);
        assert_eq!(store.head(ObjectKind::FdPipe).num_entries(), 4);
    }

    #[test]
    fn test_full_list_evicts_drawn_target_oldest_first() {
        let mut store = store_with_pipes(10, 5);
        // coin 34 (even, no skip), target 34 % 10 = 4, then four victim draws of 0.
        let mut rng = SequenceRng::new(vec![34, 34, 0, 0, 0, 0]);
        assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 4);
        let left: Vec<_> = store.head(ObjectKind::FdPipe).iter().map(|(_, o)| o.fd()).collect();
        assert_eq!(left, vec![Some(4), Some(5), Some(6), Some(7), Some(8), Some(9)]);
    }

    #[test]
    fn test_zero_target_evicts_nothing() {
        let mut store = store_with_pipes(10, 5);
        // coin 0 (no skip), target 0 % 10 = 0.
        let mut rng = SequenceRng::new(vec![0]);
        assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 0);
        assert_eq!(store.head(ObjectKind::FdPipe).num_entries(), 10);
    }

    #[test]
    fn test_scan_repeats_until_target_met() {
        let mut store = store_with_pipes(3, 3);
        // coin 2 (no skip), target 2 % 3 = 2; first scan evicts nothing (1, 1, 1),
        // second scan evicts the first two entries.
        let mut rng = SequenceRng::new(vec![2, 2, 1, 1, 1, 0, 0]);
        assert_eq!(prune_kind(&mut store, ObjectKind::FdPipe, &mut rng), 2);
        let left: Vec<_> = store.head(ObjectKind::FdPipe).iter().map(|(_, o)| o.fd()).collect();
        assert_eq!(left, vec![Some(2)]);
    }
}
