//! OrderedMap: the public map handle over a shared [`EntryStore`].

use crate::entry_store::EntryStore;
use crate::identity::{address_token, IdentityKey, Token};
use crate::live_iter::{Cursor, Entries, Keys, Shared, Values};
use core::cell::RefCell;
use core::fmt;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

/// Insertion-ordered map keyed by identity.
///
/// `OrderedMap` is a shared handle: cloning it yields another handle to the
/// same map, and every operation takes `&self`. This lets a `for_each`
/// callback or a loop over [`entries`](Self::entries) add and delete
/// entries while the walk is in progress. Removed entries are not
/// revisited; entries appended before the walk reaches the end are.
///
/// Single-threaded: the handle is neither `Send` nor `Sync`.
pub struct OrderedMap<K, V, S = RandomState> {
    store: Shared<K, V, S>,
}

impl<K, V> OrderedMap<K, V>
where
    K: IdentityKey,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> OrderedMap<K, V, S>
where
    K: IdentityKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            store: Rc::new(RefCell::new(EntryStore::with_capacity_and_hasher(
                capacity, hasher,
            ))),
        }
    }

    /// Associate `value` with `key`. An existing key keeps its position and
    /// has its value replaced; a new key is appended in its
    /// [canonical](IdentityKey::canonical) form. Returns `self` for chaining.
    pub fn set(&self, key: K, value: V) -> &Self {
        let outcome = self.store.borrow_mut().upsert(key.canonical(), value);
        drop(outcome);
        self
    }

    /// Like [`set`](Self::set), but returns the replaced value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let outcome = self.store.borrow_mut().upsert(key.canonical(), value);
        outcome.into_previous()
    }

    /// Clone of the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + IdentityKey,
        V: Clone,
    {
        self.store.borrow().lookup(key).map(|(_, v)| v.clone())
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + IdentityKey,
    {
        self.store.borrow().contains_key(key)
    }

    /// Remove the entry for `key`. Returns whether one existed.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + IdentityKey,
    {
        let freed = self.store.borrow_mut().remove(key);
        freed.is_some()
    }

    /// Remove every entry. Live iterators resume with entries added later.
    pub fn clear(&self) {
        let freed = self.store.borrow_mut().clear();
        drop(freed);
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    /// Call `f(value, key, map)` for each entry in insertion order. `f` may
    /// mutate the map through the handle it receives.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(V, K, &Self),
        K: Clone,
        V: Clone,
    {
        let mut cursor = Cursor::new(Rc::clone(&self.store));
        while let Some((k, v)) = cursor.advance_with(|k, v| (k.clone(), v.clone())) {
            f(v, k, self);
        }
    }
}

impl<K, V, S> OrderedMap<K, V, S> {
    pub fn keys(&self) -> Keys<K, V, S> {
        Keys::new(Rc::clone(&self.store))
    }

    pub fn values(&self) -> Values<K, V, S> {
        Values::new(Rc::clone(&self.store))
    }

    pub fn entries(&self) -> Entries<K, V, S> {
        Entries::new(Rc::clone(&self.store))
    }

    /// Whether both handles refer to the same map.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }
}

impl<K, V, S> Clone for OrderedMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
        }
    }
}

impl<K, V, S> IdentityKey for OrderedMap<K, V, S> {
    fn token(&self) -> Token<'_> {
        address_token(Rc::as_ptr(&self.store))
    }
}

impl<K, V, S> Default for OrderedMap<K, V, S>
where
    K: IdentityKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> fmt::Debug for OrderedMap<K, V, S>
where
    K: IdentityKey + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.try_borrow() {
            Ok(store) => f.debug_map().entries(store.iter()).finish(),
            Err(_) => f.write_str("OrderedMap { <borrowed> }"),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrderedMap<K, V, S>
where
    K: IdentityKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::default();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedMap<K, V, S>
where
    K: IdentityKey,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for OrderedMap<K, V>
where
    K: IdentityKey,
{
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<K, V, S> IntoIterator for &OrderedMap<K, V, S>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);
    type IntoIter = Entries<K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}
