use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fuzz_objects::{
    primitives::{FutexLock, Mapping, Object, SocketInfo, SysvShm},
    random::worker_rng,
    testing::SequenceRng,
    Campaign, CampaignConfig, Destructor, ObjectKind, ObjectPolicy, ObjectStore, Scope,
};
use proptest::prelude::*;

// Builds an Object of `kind` whose payload carries `serial`, so destructors can tell
// Objects apart.
fn make_object(kind: ObjectKind, serial: i32) -> Object {
    match kind {
        ObjectKind::MmapAnon => Object::MmapAnon(Mapping { ptr: serial as usize, ..Default::default() }),
        ObjectKind::MmapFile => Object::MmapFile(Mapping { ptr: serial as usize, ..Default::default() }),
        ObjectKind::MmapTestfile => Object::MmapTestfile(Mapping { ptr: serial as usize, ..Default::default() }),
        ObjectKind::Futex => Object::Futex(FutexLock { futex: serial as usize, owner_pid: 1 }),
        ObjectKind::SysvShm => Object::SysvShm(SysvShm { id: serial, ..Default::default() }),
        ObjectKind::FdSocket => Object::Socket(SocketInfo { fd: serial, ..Default::default() }),
        _ => Object::from_fd(kind, serial).unwrap(),
    }
}

fn serial_of(obj: &Object) -> i32 {
    match obj {
        Object::Futex(lock) => lock.futex as i32,
        Object::SysvShm(shm) => shm.id,
        other => other.fd().or_else(|| other.mapping().map(|m| m.ptr as i32)).unwrap(),
    }
}

type Ledger = Arc<Mutex<HashMap<i32, usize>>>;

fn recording_destructor(ledger: &Ledger) -> Destructor {
    let ledger = ledger.clone();
    Destructor::new(move |obj| {
        *ledger.lock().unwrap().entry(serial_of(obj)).or_insert(0) += 1;
    })
}

#[derive(Debug, Clone)]
enum Op {
    Insert(ObjectKind),
    DestroyRandom(ObjectKind, u32),
    DestroyAll(ObjectKind),
}

fn arb_kind() -> impl Strategy<Value = ObjectKind> {
    (0u8..fuzz_objects::MAX_OBJECT_TYPES as u8).prop_map(|tag| ObjectKind::try_from(tag).unwrap())
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => arb_kind().prop_map(Op::Insert),
        2 => (arb_kind(), any::<u32>()).prop_map(|(k, r)| Op::DestroyRandom(k, r)),
        1 => arb_kind().prop_map(Op::DestroyAll),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// The live count of every head equals the number of Objects it holds, and
    /// matches a model of inserts and destroys.
    #[test]
    fn prop_count_invariant(ops in prop::collection::vec(arb_op(), 0..200)) {
        let mut store = ObjectStore::new();
        let mut model: HashMap<ObjectKind, usize> = HashMap::new();
        let mut serial = 0;

        for op in ops {
            match op {
                Op::Insert(kind) => {
                    store.insert(make_object(kind, serial)).unwrap();
                    serial += 1;
                    *model.entry(kind).or_insert(0) += 1;
                }
                Op::DestroyRandom(kind, r) => {
                    let picked = store.random_object(kind, &mut SequenceRng::constant(r)).map(|(id, _)| id);
                    if let Some(id) = picked {
                        prop_assert!(store.destroy(kind, id));
                        *model.get_mut(&kind).unwrap() -= 1;
                    }
                }
                Op::DestroyAll(kind) => {
                    let destroyed = store.destroy_all(kind);
                    prop_assert_eq!(destroyed, model.remove(&kind).unwrap_or(0));
                }
            }
            for kind in ObjectKind::ALL {
                let head = store.head(kind);
                prop_assert_eq!(head.num_entries(), head.iter().count());
                prop_assert_eq!(head.num_entries(), model.get(&kind).copied().unwrap_or(0));
            }
        }
    }

    /// Whatever mix of explicit destruction, pruning and teardown removes an Object,
    /// its destructor runs exactly once.
    #[test]
    fn prop_destructor_runs_exactly_once(
        seed in any::<u64>(),
        limit in 1u32..6,
        ops in prop::collection::vec(arb_op(), 0..300),
    ) {
        let ledger: Ledger = Arc::new(Mutex::new(HashMap::new()));
        let mut policy = ObjectPolicy::default();
        for kind in ObjectKind::ALL {
            policy = policy.with_limit(kind, limit);
        }
        let campaign = Campaign::new(CampaignConfig { seed: Some(seed), max_workers: 1, policy });
        for kind in ObjectKind::ALL {
            campaign.set_global_destructor(kind, Some(recording_destructor(&ledger))).unwrap();
        }
        let mut worker = campaign.spawn_worker(0).unwrap();

        let mut inserted = 0;
        for op in ops {
            match op {
                Op::Insert(kind) => {
                    worker.add_object(make_object(kind, inserted), Scope::Local).unwrap();
                    inserted += 1;
                }
                Op::DestroyRandom(kind, _) => {
                    let picked = worker.random_local(kind).map(|(id, _)| id);
                    if let Some(id) = picked {
                        prop_assert!(worker.destroy_object(Scope::Local, kind, id).unwrap());
                    }
                }
                Op::DestroyAll(kind) => {
                    worker.destroy_objects(Scope::Local, kind).unwrap();
                }
            }
        }
        campaign.reap_worker(worker);

        let ledger = ledger.lock().unwrap();
        prop_assert_eq!(ledger.len(), inserted as usize);
        prop_assert!(ledger.values().all(|calls| *calls == 1));
    }

    /// Unbounded kinds lose Objects only through explicit destruction.
    #[test]
    fn prop_unbounded_kind_never_pruned(seed in any::<u64>(), inserts in 1usize..400) {
        let campaign = Campaign::new(CampaignConfig { seed: Some(seed), ..Default::default() });
        let mut worker = campaign.spawn_worker(0).unwrap();
        // A bounded neighbour keeps the pruning engine busy.
        worker.set_local_limit(ObjectKind::FdFile, 2);
        for i in 0..inserts {
            worker.add_object(Object::Pipe(i as i32), Scope::Local).unwrap();
            worker.add_object(Object::File((inserts + i) as i32), Scope::Local).unwrap();
        }
        prop_assert_eq!(worker.num_entries(Scope::Local, ObjectKind::FdPipe).unwrap(), inserts);
    }

    /// Selecting from an empty head yields nothing and changes nothing.
    #[test]
    fn prop_empty_selection(seed in any::<u64>(), kind in arb_kind()) {
        let (destroy, calls) = fuzz_objects::testing::counting_destructor();
        let mut store = ObjectStore::new();
        store.head_mut(kind).set_destructor(Some(destroy));
        let mut rng = worker_rng(seed);
        for _ in 0..10 {
            prop_assert!(store.random_object(kind, &mut rng).is_none());
        }
        prop_assert_eq!(store.head(kind).num_entries(), 0);
        prop_assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
