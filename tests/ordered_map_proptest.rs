use live_ordered_map::{Entries, OrderedMap};
use proptest::prelude::*;

// Operations over a small key space. Iterator slots hold live `entries()`
// walks that are advanced between mutations.
#[derive(Clone, Debug)]
enum Op {
    Set(u8, i32),
    Delete(u8),
    Clear,
    Open(usize),
    Next(usize),
    Drop(usize),
    // for_each that deletes every entry whose key is a multiple of `n`
    ForEachDeleting(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8, any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        3 => (0u8..8).prop_map(Op::Delete),
        1 => Just(Op::Clear),
        1 => (0usize..2).prop_map(Op::Open),
        4 => (0usize..2).prop_map(Op::Next),
        1 => (0usize..2).prop_map(Op::Drop),
        1 => (1u8..4).prop_map(Op::ForEachDeleting),
    ]
}

#[derive(Default)]
struct Model {
    entries: Vec<(u64, u8, i32)>,
    serial: u64,
}

impl Model {
    fn set(&mut self, k: u8, v: i32) {
        match self.entries.iter_mut().find(|e| e.1 == k) {
            Some(e) => e.2 = v,
            None => {
                self.serial += 1;
                self.entries.push((self.serial, k, v));
            }
        }
    }

    fn after(&self, last: Option<u64>) -> Option<(u64, u8, i32)> {
        self.entries
            .iter()
            .copied()
            .find(|e| last.map_or(true, |s| e.0 > s))
    }
}

struct Walk {
    it: Entries<u8, i32>,
    last: Option<u64>,
    done: bool,
}

// Property: the public map agrees with a serial-numbered model.
// - `entries()` order and `size()` match after every operation.
// - Each live iterator yields the first entry inserted after the one it
//   last yielded, whatever was set, deleted or cleared in between.
// - `for_each` that deletes entries mid-walk visits exactly the entries the
//   model predicts.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_live_iteration_matches_model(ops in proptest::collection::vec(arb_op(), 1..100)) {
        let map: OrderedMap<u8, i32> = OrderedMap::new();
        let mut model = Model::default();
        let mut walks: [Option<Walk>; 2] = [None, None];

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    map.set(k, v);
                    model.set(k, v);
                }
                Op::Delete(k) => {
                    let had = model.entries.iter().any(|e| e.1 == k);
                    model.entries.retain(|e| e.1 != k);
                    prop_assert_eq!(map.delete(&k), had);
                }
                Op::Clear => {
                    map.clear();
                    model.entries.clear();
                }
                Op::Open(i) => {
                    walks[i] = Some(Walk { it: map.entries(), last: None, done: false });
                }
                Op::Next(i) => {
                    if let Some(w) = walks[i].as_mut() {
                        let got = w.it.next();
                        let want = if w.done { None } else { model.after(w.last) };
                        match want {
                            Some((serial, k, v)) => {
                                prop_assert_eq!(got, Some((k, v)));
                                w.last = Some(serial);
                            }
                            None => {
                                prop_assert_eq!(got, None);
                                w.done = true;
                            }
                        }
                    }
                }
                Op::Drop(i) => {
                    walks[i] = None;
                }
                Op::ForEachDeleting(n) => {
                    // Model: walk by serial, deleting as we go.
                    let mut expected = Vec::new();
                    let mut last = None;
                    while let Some((serial, k, v)) = model.after(last) {
                        expected.push((k, v));
                        last = Some(serial);
                        if k % n == 0 {
                            model.entries.retain(|e| e.1 != k);
                        }
                    }
                    let mut visited = Vec::new();
                    map.for_each(|v, k, m| {
                        visited.push((k, v));
                        if k % n == 0 {
                            m.delete(&k);
                        }
                    });
                    prop_assert_eq!(visited, expected);
                }
            }

            let got: Vec<_> = map.entries().collect();
            let want: Vec<_> = model.entries.iter().map(|e| (e.1, e.2)).collect();
            prop_assert_eq!(got, want);
            prop_assert_eq!(map.size(), model.entries.len());
        }
    }
}
