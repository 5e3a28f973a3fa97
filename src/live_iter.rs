//! Live iterators: single-pass cursors that tolerate removal of entries,
//! including the one they last returned, while iteration is in progress.
//!
//! A cursor holds a shared handle to the store and the last entry it
//! yielded. That entry stays pinned, so it survives as a tombstone if it is
//! removed, and the next step can walk back from it to a live predecessor.
//! The store is only borrowed for the duration of a step, so the container
//! may be freely mutated between steps.

use crate::entry_store::{EntryStore, Handle};
use core::iter::FusedIterator;
use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

pub(crate) type Shared<K, V, S> = Rc<RefCell<EntryStore<K, V, S>>>;

pub(crate) struct Cursor<K, V, S> {
    // `None` once finished
    store: Option<Shared<K, V, S>>,
    last: Option<Handle>,
}

impl<K, V, S> Cursor<K, V, S> {
    pub(crate) fn new(store: Shared<K, V, S>) -> Self {
        Self {
            store: Some(store),
            last: None,
        }
    }

    /// Pull one step and project the entry through `project`.
    pub(crate) fn advance_with<T>(&mut self, project: impl FnOnce(&K, &V) -> T) -> Option<T> {
        let shared = self.store.as_ref()?;
        let (next, freed) = shared.borrow_mut().advance(self.last.take());
        drop(freed);
        self.last = next;
        // `project` runs user `Clone` code, so only a shared borrow is held.
        let item = match next {
            Some(h) => {
                let store = shared.borrow();
                let (k, v) = store.pinned(h);
                Some(project(k, v))
            }
            None => None,
        };
        if item.is_none() {
            self.store = None;
        }
        item
    }
}

impl<K, V, S> Drop for Cursor<K, V, S> {
    fn drop(&mut self) {
        let (Some(shared), Some(h)) = (self.store.take(), self.last.take()) else {
            return;
        };
        let freed = match shared.try_borrow_mut() {
            Ok(mut store) => store.unpin(h),
            Err(_) => {
                // Only reachable when a key or value owning this cursor is
                // dropped inside a store operation.
                tracing::debug!("store busy while dropping a live iterator; pin leaked");
                return;
            }
        };
        drop(freed);
    }
}

macro_rules! live_iterator {
    ($(#[$doc:meta])* $name:ident<$k:ident, $v:ident> where [$($bound:tt)*] => $item:ty, |$pk:pat_param, $pv:pat_param| $project:expr) => {
        $(#[$doc])*
        pub struct $name<$k, $v, S = RandomState> {
            cursor: Cursor<$k, $v, S>,
        }

        impl<$k, $v, S> $name<$k, $v, S> {
            pub(crate) fn new(store: Shared<$k, $v, S>) -> Self {
                Self {
                    cursor: Cursor::new(store),
                }
            }
        }

        impl<$k, $v, S> Iterator for $name<$k, $v, S>
        where
            $($bound)*
        {
            type Item = $item;

            #[inline]
            fn next(&mut self) -> Option<Self::Item> {
                self.cursor.advance_with(|$pk, $pv| $project)
            }
        }

        impl<$k, $v, S> FusedIterator for $name<$k, $v, S> where $($bound)* {}
    };
}

live_iterator!(
    /// Keys of an [`OrderedMap`](crate::OrderedMap) in insertion order.
    Keys<K, V> where [K: Clone] => K, |k, _| k.clone()
);

live_iterator!(
    /// Values of an [`OrderedMap`](crate::OrderedMap) in insertion order.
    Values<K, V> where [V: Clone] => V, |_, v| v.clone()
);

live_iterator!(
    /// `(key, value)` pairs of an [`OrderedMap`](crate::OrderedMap) in
    /// insertion order.
    Entries<K, V> where [K: Clone, V: Clone] => (K, V), |k, v| (k.clone(), v.clone())
);

/// Elements of an [`OrderedSet`](crate::OrderedSet) in insertion order.
pub struct SetValues<T, S = RandomState> {
    cursor: Cursor<T, (), S>,
}

impl<T, S> SetValues<T, S> {
    pub(crate) fn new(store: Shared<T, (), S>) -> Self {
        Self {
            cursor: Cursor::new(store),
        }
    }
}

impl<T: Clone, S> Iterator for SetValues<T, S> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.cursor.advance_with(|t, _| t.clone())
    }
}

impl<T: Clone, S> FusedIterator for SetValues<T, S> {}

/// `(value, value)` pairs of an [`OrderedSet`](crate::OrderedSet), mirroring
/// the map entry shape.
pub struct SetEntries<T, S = RandomState> {
    cursor: Cursor<T, (), S>,
}

impl<T, S> SetEntries<T, S> {
    pub(crate) fn new(store: Shared<T, (), S>) -> Self {
        Self {
            cursor: Cursor::new(store),
        }
    }
}

impl<T: Clone, S> Iterator for SetEntries<T, S> {
    type Item = (T, T);

    #[inline]
    fn next(&mut self) -> Option<(T, T)> {
        self.cursor.advance_with(|t, _| (t.clone(), t.clone()))
    }
}

impl<T: Clone, S> FusedIterator for SetEntries<T, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(keys: &[&'static str]) -> Shared<&'static str, usize, RandomState> {
        let mut store = EntryStore::new();
        for (i, k) in keys.iter().enumerate() {
            store.upsert(*k, i);
        }
        Rc::new(RefCell::new(store))
    }

    #[test]
    fn projections_share_one_order() {
        let s = shared(&["a", "b", "c"]);
        let keys: Vec<_> = Keys::new(Rc::clone(&s)).collect();
        let values: Vec<_> = Values::new(Rc::clone(&s)).collect();
        let entries: Vec<_> = Entries::new(Rc::clone(&s)).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(values, [0, 1, 2]);
        assert_eq!(entries, [("a", 0), ("b", 1), ("c", 2)]);
    }

    #[test]
    fn finished_cursor_releases_store() {
        let s = shared(&["a"]);
        let mut it = Keys::new(Rc::clone(&s));
        assert_eq!(it.next(), Some("a"));
        assert_eq!(Rc::strong_count(&s), 2);
        assert_eq!(it.next(), None);
        assert_eq!(Rc::strong_count(&s), 1, "exhausted iterator drops its handle");
        s.borrow_mut().upsert("b", 1);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn dropping_a_parked_cursor_frees_its_tombstone() {
        let s = shared(&["a", "b"]);
        let mut it = Keys::new(Rc::clone(&s));
        assert_eq!(it.next(), Some("a"));
        let _ = s.borrow_mut().remove("a");
        assert_eq!(s.borrow().tombstones(), 1);
        drop(it);
        assert_eq!(s.borrow().tombstones(), 0);
    }

    #[test]
    fn dropping_while_store_is_borrowed_leaks_pin_without_panicking() {
        let s = shared(&["a"]);
        let mut it = Keys::new(Rc::clone(&s));
        assert_eq!(it.next(), Some("a"));
        let _ = s.borrow_mut().remove("a");
        {
            let _busy = s.borrow_mut();
            drop(it);
        }
        assert_eq!(s.borrow().tombstones(), 1, "tombstone outlives leaked pin");
    }

    #[test]
    fn set_iterators_project_elements() {
        let mut store = EntryStore::new();
        store.upsert("x", ());
        store.upsert("y", ());
        let s = Rc::new(RefCell::new(store));
        let values: Vec<_> = SetValues::new(Rc::clone(&s)).collect();
        let entries: Vec<_> = SetEntries::new(s).collect();
        assert_eq!(values, ["x", "y"]);
        assert_eq!(entries, [("x", "x"), ("y", "y")]);
    }
}
