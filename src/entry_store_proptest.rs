#![cfg(test)]

// Property tests for EntryStore kept inside the crate so they can drive the
// crate-private cursor primitives directly.

use crate::entry_store::{EntryStore, Handle};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::hash::Hasher;

const CURSORS: usize = 3;

// Pool-indexed operations so that shrinking moves toward earlier keys and
// shorter programs.
#[derive(Clone, Debug)]
enum Op {
    Upsert(usize, i32),
    Remove(usize),
    Lookup(usize),
    Clear,
    Open(usize),
    Step(usize),
    Close(usize),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=8).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let cur = 0..CURSORS;
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Upsert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::Lookup),
            1 => Just(Op::Clear),
            1 => cur.clone().prop_map(Op::Open),
            4 => cur.clone().prop_map(Op::Step),
            1 => cur.prop_map(Op::Close),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Reference model: entries carry an insertion serial, and a cursor resumes
/// at the first entry whose serial is greater than the last one it yielded.
#[derive(Default)]
struct Model {
    entries: Vec<(u64, String, i32)>,
    serial: u64,
}

impl Model {
    fn upsert(&mut self, k: &str, v: i32) -> Option<i32> {
        if let Some(e) = self.entries.iter_mut().find(|e| e.1 == k) {
            return Some(std::mem::replace(&mut e.2, v));
        }
        self.serial += 1;
        self.entries.push((self.serial, k.to_string(), v));
        None
    }

    fn remove(&mut self, k: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.1 != k);
        before != self.entries.len()
    }

    fn next_after(&self, last: Option<u64>) -> Option<&(u64, String, i32)> {
        self.entries
            .iter()
            .find(|e| last.map_or(true, |s| e.0 > s))
    }
}

struct Walk {
    pin: Option<Handle>,
    last_serial: Option<u64>,
    done: bool,
}

impl Walk {
    fn new() -> Self {
        Walk {
            pin: None,
            last_serial: None,
            done: false,
        }
    }
}

fn close<S: BuildHasher>(store: &mut EntryStore<String, i32, S>, walk: Option<Walk>) {
    if let Some(pin) = walk.and_then(|w| w.pin) {
        drop(store.unpin(pin));
    }
}

fn run<S: BuildHasher>(
    mut sut: EntryStore<String, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model = Model::default();
    let mut walks: Vec<Option<Walk>> = (0..CURSORS).map(|_| None).collect();

    for op in ops {
        match op {
            Op::Upsert(i, v) => {
                let k = &pool[i];
                let prev = sut.upsert(k.clone(), v).into_previous();
                prop_assert_eq!(prev, model.upsert(k, v));
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let removed = sut.remove(k.as_str()).is_some();
                prop_assert_eq!(removed, model.remove(k));
            }
            Op::Lookup(i) => {
                let k = &pool[i];
                let expect = model.entries.iter().find(|e| &e.1 == k).map(|e| e.2);
                prop_assert_eq!(sut.lookup(k.as_str()).map(|(_, v)| *v), expect);
                prop_assert_eq!(sut.contains_key(k.as_str()), expect.is_some());
            }
            Op::Clear => {
                drop(sut.clear());
                model.entries.clear();
            }
            Op::Open(c) => {
                let old = walks[c].replace(Walk::new());
                close(&mut sut, old);
            }
            Op::Step(c) => {
                let Some(w) = walks[c].as_mut() else { continue };
                if w.done {
                    continue;
                }
                let (next, freed) = sut.advance(w.pin.take());
                drop(freed);
                let expect = model.next_after(w.last_serial);
                match (next, expect) {
                    (Some(h), Some((serial, k, v))) => {
                        let (sk, sv) = sut.pinned(h);
                        prop_assert_eq!(sk, k);
                        prop_assert_eq!(sv, v);
                        w.pin = Some(h);
                        w.last_serial = Some(*serial);
                    }
                    (None, None) => w.done = true,
                    (got, want) => {
                        prop_assert!(false, "cursor diverged: got {:?}, want {:?}", got, want);
                    }
                }
            }
            Op::Close(c) => {
                let old = walks[c].take();
                close(&mut sut, old);
            }
        }

        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.entries.len());
        let order: Vec<_> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let want: Vec<_> = model.entries.iter().map(|e| (e.1.clone(), e.2)).collect();
        prop_assert_eq!(order, want);

        let parked = walks.iter().flatten().filter(|w| w.pin.is_some()).count();
        if parked == 0 {
            prop_assert_eq!(sut.tombstones(), 0, "tombstones retained with no parked cursor");
        }
    }

    for w in walks.iter_mut() {
        close(&mut sut, w.take());
    }
    prop_assert_eq!(sut.tombstones(), 0);
    Ok(())
}

// Property: EntryStore matches the serial model under arbitrary interleavings
// of mutation and cursor steps.
// - Live order and values equal the model's after every operation.
// - Each cursor step yields the first entry inserted after the last one that
//   cursor yielded, regardless of deletes and clears in between.
// - Tombstones exist only while some cursor is parked.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_serial_model((pool, ops) in arb_scenario()) {
        run(EntryStore::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress token equality.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_serial_model_under_collisions((pool, ops) in arb_scenario()) {
        run(EntryStore::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}
