#![no_main]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fuzz_objects::{
    testing::SequenceRng, Campaign, CampaignConfig, Destructor, Object, ObjectKind, ObjectPolicy, Scope,
};
use libfuzzer_sys::fuzz_target;

// One registry call made by a worker. Kinds are raw tags so that out-of-range
// values exercise the tag conversion as well.
#[derive(Debug, Clone, arbitrary::Arbitrary)]
enum FuzzOp {
    Insert { tag: u8, global: bool },
    Select { tag: u8, global: bool },
    DestroyRandom { tag: u8, global: bool },
    DestroyAll { tag: u8, global: bool },
    SetLimit { tag: u8, limit: u8 },
}

#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzInput {
    limits: [u8; 4],
    script: Vec<u32>,
    ops: Vec<FuzzOp>,
}

fn scope(global: bool) -> Scope {
    if global {
        Scope::Global
    } else {
        Scope::Local
    }
}

fuzz_target!(|data: FuzzInput| {
    let mut policy = ObjectPolicy::default();
    for (kind, limit) in ObjectKind::ALL.iter().zip(data.limits.iter()) {
        policy = policy.with_limit(*kind, u32::from(*limit % 16));
    }
    let campaign = Campaign::new(CampaignConfig { seed: Some(0), max_workers: 1, policy });

    // Every Object's serial must be destroyed exactly once.
    let ledger: Arc<Mutex<HashMap<i32, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    for kind in ObjectKind::ALL {
        let ledger = ledger.clone();
        let destroy = Destructor::new(move |obj| {
            let serial = obj.fd().unwrap_or_default();
            *ledger.lock().unwrap().entry(serial).or_insert(0) += 1;
        });
        campaign.set_global_destructor(kind, Some(destroy)).unwrap();
    }

    let script = if data.script.is_empty() { vec![0] } else { data.script };
    let mut worker = campaign.spawn_worker_with_rng(0, 0, SequenceRng::new(script)).unwrap();
    let mut serial = 0;

    for op in data.ops.into_iter().take(512) {
        match op {
            FuzzOp::Insert { tag, global } => {
                let Ok(kind) = ObjectKind::try_from(tag) else { continue };
                let Some(obj) = Object::from_fd(kind, serial) else { continue };
                serial += 1;
                worker.add_object(obj, scope(global)).unwrap();
            }
            FuzzOp::Select { tag, global } => {
                let Ok(kind) = ObjectKind::try_from(tag) else { continue };
                let before = worker.num_entries(scope(global), kind).unwrap();
                let picked = worker.with_random_object(kind, scope(global), |id, _| id).unwrap();
                assert_eq!(picked.is_some(), before > 0);
                assert_eq!(worker.num_entries(scope(global), kind).unwrap(), before);
            }
            FuzzOp::DestroyRandom { tag, global } => {
                let Ok(kind) = ObjectKind::try_from(tag) else { continue };
                if let Some(id) = worker.with_random_object(kind, scope(global), |id, _| id).unwrap() {
                    assert!(worker.destroy_object(scope(global), kind, id).unwrap());
                }
            }
            FuzzOp::DestroyAll { tag, global } => {
                let Ok(kind) = ObjectKind::try_from(tag) else { continue };
                worker.destroy_objects(scope(global), kind).unwrap();
            }
            FuzzOp::SetLimit { tag, limit } => {
                let Ok(kind) = ObjectKind::try_from(tag) else { continue };
                worker.set_local_limit(kind, u32::from(limit % 16));
            }
        }
        for kind in ObjectKind::ALL {
            let head = worker.objects().head(kind);
            assert_eq!(head.num_entries(), head.iter().count());
        }
    }

    campaign.reap_worker(worker);
    campaign.destroy_global_objects().unwrap();

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.len(), serial as usize);
    assert!(ledger.values().all(|calls| *calls == 1));
});
