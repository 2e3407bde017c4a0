#![no_main]

use fuzz_objects::{registry::prune_kind, testing::SequenceRng, Object, ObjectKind, ObjectStore};
use libfuzzer_sys::fuzz_target;

// Drives one pruning pass over a single full list with a scripted generator.
// The pass must terminate, evict exactly its target and never touch an
// unbounded list.
#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzInput {
    live: u8,
    capacity: u8,
    script: Vec<u32>,
}

fuzz_target!(|data: FuzzInput| {
    // A script without a single victim draw of 0 mod 10 would never finish a scan.
    let mut script = data.script;
    script.truncate(64);
    script.push(0);

    let mut store = ObjectStore::new();
    store.head_mut(ObjectKind::FdPipe).set_max_entries(u32::from(data.capacity));
    for fd in 0..i32::from(data.live) {
        store.insert(Object::Pipe(fd)).unwrap();
        store.insert(Object::File(fd + 256)).unwrap();
    }

    let before = store.head(ObjectKind::FdPipe).num_entries();
    let pruned = prune_kind(&mut store, ObjectKind::FdPipe, &mut SequenceRng::new(script));
    let after = store.head(ObjectKind::FdPipe).num_entries();

    assert_eq!(before - after, pruned);
    if data.capacity == 0 || before < usize::from(data.capacity) {
        assert_eq!(pruned, 0);
    }
    assert!(pruned < before.max(1));
    assert_eq!(store.head(ObjectKind::FdFile).num_entries(), usize::from(data.live));
});
