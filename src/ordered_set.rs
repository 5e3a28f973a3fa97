//! OrderedSet: the public set handle. Elements are stored as given, with no
//! canonicalisation, and carry a unit payload.

use crate::entry_store::EntryStore;
use crate::identity::{address_token, IdentityKey, Token};
use crate::live_iter::{Cursor, SetEntries, SetValues, Shared};
use core::cell::RefCell;
use core::fmt;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

/// Insertion-ordered set of identity-keyed values.
///
/// Shares its storage and iteration rules with
/// [`OrderedMap`](crate::OrderedMap); each element is stored as a key with
/// no payload.
pub struct OrderedSet<T, S = RandomState> {
    store: Shared<T, (), S>,
}

impl<T> OrderedSet<T>
where
    T: IdentityKey,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, S> OrderedSet<T, S>
where
    T: IdentityKey,
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

    /// Add `value` if absent. An element already present keeps its position
    /// and the stored instance is not replaced. Returns `self` for chaining.
    pub fn add(&self, value: T) -> &Self {
        self.insert(value);
        self
    }

    /// Add `value` if absent, returning whether it was new.
    pub fn insert(&self, value: T) -> bool {
        let outcome = self.store.borrow_mut().upsert(value, ());
        outcome.is_inserted()
    }

    pub fn has<Q>(&self, value: &Q) -> bool
    where
        Q: ?Sized + IdentityKey,
    {
        self.store.borrow().contains_key(value)
    }

    pub fn delete<Q>(&self, value: &Q) -> bool
    where
        Q: ?Sized + IdentityKey,
    {
        let freed = self.store.borrow_mut().remove(value);
        freed.is_some()
    }

    pub fn clear(&self) {
        let freed = self.store.borrow_mut().clear();
        drop(freed);
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    /// Call `f(value, value, set)` for each element in insertion order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(T, T, &Self),
        T: Clone,
    {
        let mut cursor = Cursor::new(Rc::clone(&self.store));
        while let Some(t) = cursor.advance_with(|t, _| t.clone()) {
            f(t.clone(), t, self);
        }
    }
}

impl<T, S> OrderedSet<T, S> {
    pub fn values(&self) -> SetValues<T, S> {
        SetValues::new(Rc::clone(&self.store))
    }

    /// Same sequence as [`values`](Self::values).
    pub fn keys(&self) -> SetValues<T, S> {
        self.values()
    }

    pub fn entries(&self) -> SetEntries<T, S> {
        SetEntries::new(Rc::clone(&self.store))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }
}

impl<T, S> Clone for OrderedSet<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
        }
    }
}

impl<T, S> IdentityKey for OrderedSet<T, S> {
    fn token(&self) -> Token<'_> {
        address_token(Rc::as_ptr(&self.store))
    }
}

impl<T, S> Default for OrderedSet<T, S>
where
    T: IdentityKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> fmt::Debug for OrderedSet<T, S>
where
    T: IdentityKey + fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.try_borrow() {
            Ok(store) => f.debug_set().entries(store.iter().map(|(t, _)| t)).finish(),
            Err(_) => f.write_str("OrderedSet { <borrowed> }"),
        }
    }
}

impl<T, S> FromIterator<T> for OrderedSet<T, S>
where
    T: IdentityKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let set = Self::default();
        for t in iter {
            set.add(t);
        }
        set
    }
}

impl<T, S> Extend<T> for OrderedSet<T, S>
where
    T: IdentityKey,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for t in iter {
            self.add(t);
        }
    }
}

impl<T, const N: usize> From<[T; N]> for OrderedSet<T>
where
    T: IdentityKey,
{
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T, S> IntoIterator for &OrderedSet<T, S>
where
    T: Clone,
{
    type Item = T;
    type IntoIter = SetValues<T, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.values()
    }
}
