//! EntryStore: insertion-ordered arena of entries with an identity index.
//!
//! Entries live in a generational `SlotMap` and form a doubly-linked chain
//! in insertion order. A `HashTable` maps the hash of each live entry's
//! token to its slot; the hash is computed once at insertion and stored.
//!
//! Removal tombstones an entry instead of freeing it. The tombstone is
//! spliced out of the live chain but keeps its own `prev` link, so a cursor
//! parked on it can walk back to the nearest live predecessor and resume
//! from there. Each entry counts its references: cursors parked on it plus
//! tombstones whose `prev` names it. A tombstone is freed once its count
//! reaches zero, which in turn releases its `prev` (so frees can cascade).
//!
//! Freed `(K, V)` pairs are handed back as [`Reclaimed`] rather than dropped
//! in place, so that user `Drop` code never runs while the store is
//! mid-operation or borrowed.

use crate::identity::{IdentityKey, Token};
use crate::reentrancy::DebugReentrancy;
use core::hash::BuildHasher;
use core::mem;
use hashbrown::hash_table;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable, generational reference to an entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn raw(self) -> DefaultKey {
        self.0
    }
}

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
    removed: bool,
    // parked cursors + tombstones whose `prev` is this slot
    refs: usize,
}

/// Outcome of [`EntryStore::upsert`].
#[derive(Debug)]
pub enum Upsert<K, V> {
    /// A new entry was linked at the tail.
    Inserted(Handle),
    /// The key was already present. Its value was replaced in place; the
    /// duplicate key and the previous value are returned to the caller.
    Updated { handle: Handle, key: K, value: V },
}

impl<K, V> Upsert<K, V> {
    pub fn handle(&self) -> Handle {
        match self {
            Upsert::Inserted(h) => *h,
            Upsert::Updated { handle, .. } => *handle,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Upsert::Inserted(_))
    }

    /// The replaced value, if the key already existed.
    pub fn into_previous(self) -> Option<V> {
        match self {
            Upsert::Inserted(_) => None,
            Upsert::Updated { value, .. } => Some(value),
        }
    }
}

/// Key/value pairs freed by a store operation. Dropping this drops them.
#[derive(Debug)]
pub struct Reclaimed<K, V>(Vec<(K, V)>);

impl<K, V> Reclaimed<K, V> {
    fn new() -> Self {
        Reclaimed(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> Default for Reclaimed<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IntoIterator for Reclaimed<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Arena plus link state. Kept apart from the index so that link surgery
/// can borrow it mutably while the reentrancy guard is held.
struct Chain<K, V> {
    slots: SlotMap<DefaultKey, Slot<K, V>>, // live entries and retained tombstones
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    len: usize,
}

impl<K, V> Chain<K, V> {
    fn link_tail(&mut self, key: K, value: V, hash: u64) -> DefaultKey {
        let k = self.slots.insert(Slot {
            key,
            value,
            hash,
            prev: self.tail,
            next: None,
            removed: false,
            refs: 0,
        });
        match self.tail {
            Some(t) => self.slots[t].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        self.len += 1;
        k
    }

    fn tombstone(&mut self, k: DefaultKey) -> Reclaimed<K, V> {
        let (prev, next) = {
            let slot = &mut self.slots[k];
            slot.removed = true;
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => {
                let before = &mut self.slots[p];
                before.next = next;
                // the tombstone keeps pointing at `p`
                before.refs += 1;
            }
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;

        let mut out = Reclaimed::new();
        if self.slots[k].refs == 0 {
            self.reclaim(k, &mut out);
        }
        out
    }

    fn tombstone_all(&mut self) -> Reclaimed<K, V> {
        let cleared = self.len;
        let mut cur = self.head.take();
        self.tail = None;
        self.len = 0;
        while let Some(k) = cur {
            let slot = &mut self.slots[k];
            cur = slot.next.take();
            slot.prev = None;
            slot.removed = true;
        }

        let mut out = Reclaimed::new();
        let idle: Vec<DefaultKey> = self
            .slots
            .iter()
            .filter(|(_, s)| s.refs == 0)
            .map(|(k, _)| k)
            .collect();
        for k in idle {
            if self.slots.contains_key(k) {
                self.reclaim(k, &mut out);
            }
        }
        tracing::trace!(
            cleared,
            retained = self.slots.len(),
            "entry store cleared"
        );
        out
    }

    fn step(&mut self, from: Option<DefaultKey>) -> (Option<DefaultKey>, Reclaimed<K, V>) {
        let mut anchor = from;
        while let Some(k) = anchor {
            let slot = &self.slots[k];
            if !slot.removed {
                break;
            }
            anchor = slot.prev;
        }
        let next = match anchor {
            Some(k) => self.slots[k].next,
            None => self.head,
        };
        if let Some(n) = next {
            self.slots[n].refs += 1;
        }
        let mut out = Reclaimed::new();
        if let Some(k) = from {
            self.release(k, &mut out);
        }
        (next, out)
    }

    fn release(&mut self, k: DefaultKey, out: &mut Reclaimed<K, V>) {
        let slot = &mut self.slots[k];
        debug_assert!(slot.refs > 0, "release of unreferenced entry");
        slot.refs -= 1;
        if slot.removed && slot.refs == 0 {
            self.reclaim(k, out);
        }
    }

    /// Free tombstone `k` and any predecessors it was the last holder of.
    fn reclaim(&mut self, mut k: DefaultKey, out: &mut Reclaimed<K, V>) {
        let mut freed = 0usize;
        loop {
            let Some(slot) = self.slots.remove(k) else {
                debug_assert!(false, "reclaim of a freed slot");
                break;
            };
            debug_assert!(slot.removed && slot.refs == 0);
            let prev = slot.prev;
            out.0.push((slot.key, slot.value));
            freed += 1;
            let Some(p) = prev else { break };
            let before = &mut self.slots[p];
            before.refs -= 1;
            if !(before.removed && before.refs == 0) {
                break;
            }
            k = p;
        }
        if freed > 1 {
            tracing::trace!(freed, "reclaimed tombstone chain");
        }
    }

    fn live(&self, k: DefaultKey) -> Option<&Slot<K, V>> {
        self.slots.get(k).filter(|s| !s.removed)
    }
}

pub struct EntryStore<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    chain: Chain<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> EntryStore<K, V>
where
    K: IdentityKey,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for EntryStore<K, V>
where
    K: IdentityKey,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing iterator over live entries in insertion order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Slot<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let slot = &self.slots[k];
        self.next = slot.next;
        self.remaining -= 1;
        Some((&slot.key, &slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V, S> EntryStore<K, V, S>
where
    K: IdentityKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            chain: Chain {
                slots: SlotMap::with_capacity_and_key(capacity),
                head: None,
                tail: None,
                len: 0,
            },
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn make_hash(&self, token: &Token<'_>) -> u64 {
        self.hasher.hash_one(token)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.chain.len
    }

    pub fn is_empty(&self) -> bool {
        self.chain.len == 0
    }

    /// Number of removed entries still retained for parked cursors.
    pub fn tombstones(&self) -> usize {
        self.chain.slots.len() - self.chain.len
    }

    fn find_slot<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        Q: ?Sized + IdentityKey,
    {
        let token = q.token();
        let hash = self.make_hash(&token);
        let slots = &self.chain.slots;
        self.index
            .find(hash, |&k| slots[k].key.token() == token)
            .copied()
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        Q: ?Sized + IdentityKey,
    {
        let _g = self.reentrancy.enter("find");
        self.find_slot(q).map(Handle)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        Q: ?Sized + IdentityKey,
    {
        let _g = self.reentrancy.enter("contains_key");
        self.find_slot(q).is_some()
    }

    /// Key and value of the live entry matching `q`.
    pub fn lookup<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized + IdentityKey,
    {
        let _g = self.reentrancy.enter("lookup");
        let k = self.find_slot(q)?;
        let slot = &self.chain.slots[k];
        Some((&slot.key, &slot.value))
    }

    /// Insert `key -> value`, or replace the value in place if the key is
    /// already present. Replacing keeps the entry's handle and position.
    pub fn upsert(&mut self, key: K, value: V) -> Upsert<K, V> {
        let _g = self.reentrancy.enter("upsert");
        let token = key.token();
        let hash = self.make_hash(&token);
        let slots = &self.chain.slots;
        match self.index.entry(
            hash,
            |&k| slots[k].key.token() == token,
            |&k| slots[k].hash,
        ) {
            hash_table::Entry::Occupied(o) => {
                let k = *o.get();
                let old = mem::replace(&mut self.chain.slots[k].value, value);
                Upsert::Updated {
                    handle: Handle(k),
                    key,
                    value: old,
                }
            }
            hash_table::Entry::Vacant(v) => {
                let k = self.chain.link_tail(key, value, hash);
                let _ = v.insert(k);
                Upsert::Inserted(Handle(k))
            }
        }
    }

    /// Remove the entry matching `q`. Returns `None` if there was none;
    /// otherwise the pairs freed by the removal (empty while a cursor still
    /// needs the tombstone).
    pub fn remove<Q>(&mut self, q: &Q) -> Option<Reclaimed<K, V>>
    where
        Q: ?Sized + IdentityKey,
    {
        let _g = self.reentrancy.enter("remove");
        let token = q.token();
        let hash = self.make_hash(&token);
        let slots = &self.chain.slots;
        let k = match self
            .index
            .find_entry(hash, |&k| slots[k].key.token() == token)
        {
            Ok(occupied) => occupied.remove().0,
            Err(_) => return None,
        };
        Some(self.chain.tombstone(k))
    }

    /// Tombstone every live entry and reset the store to empty. Tombstones
    /// lose their `prev` link, so a cursor parked on one restarts from the
    /// (new) head.
    pub fn clear(&mut self) -> Reclaimed<K, V> {
        let _g = self.reentrancy.enter("clear");
        self.index.clear();
        self.chain.tombstone_all()
    }

    /// Borrowing walk over live entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.chain.slots,
            next: self.chain.head,
            remaining: self.chain.len,
        }
    }

    pub fn key(&self, h: Handle) -> Option<&K> {
        self.chain.live(h.raw()).map(|s| &s.key)
    }

    pub fn value(&self, h: Handle) -> Option<&V> {
        self.chain.live(h.raw()).map(|s| &s.value)
    }

    pub fn value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.chain
            .slots
            .get_mut(h.raw())
            .filter(|s| !s.removed)
            .map(|s| &mut s.value)
    }

    /// Structural self-check used by tests.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let slots = &self.chain.slots;
        let mut count = 0;
        let mut prev = None;
        let mut cur = self.chain.head;
        while let Some(k) = cur {
            let slot = &slots[k];
            assert!(!slot.removed, "tombstone reachable from head");
            assert_eq!(slot.prev, prev, "broken back link");
            assert_eq!(self.find_slot(&slot.key), Some(k), "index out of sync");
            count += 1;
            prev = cur;
            cur = slot.next;
        }
        assert_eq!(self.chain.tail, prev, "tail is not the last live entry");
        assert_eq!(count, self.chain.len);
        assert_eq!(self.index.len(), self.chain.len);

        // every retained tombstone is referenced by a cursor or a younger tombstone
        let mut back_refs: std::collections::HashMap<DefaultKey, usize> = Default::default();
        for (_, slot) in slots.iter().filter(|(_, s)| s.removed) {
            if let Some(p) = slot.prev {
                *back_refs.entry(p).or_default() += 1;
            }
        }
        for (k, slot) in slots.iter() {
            let links = back_refs.get(&k).copied().unwrap_or(0);
            assert!(slot.refs >= links, "refcount below tombstone back links");
            if slot.removed {
                assert!(slot.refs > 0, "unreferenced tombstone retained");
            }
        }
    }
}

// Cursor support needs no hashing, so it is available without key bounds.
impl<K, V, S> EntryStore<K, V, S> {
    /// Step a cursor. `from` is the cursor's last-returned (and pinned)
    /// entry, or `None` if it has not started. Walks back over tombstones to
    /// the nearest live entry and returns its successor (or the head when no
    /// live predecessor remains), pinned. The pin on `from` is released.
    pub(crate) fn advance(&mut self, from: Option<Handle>) -> (Option<Handle>, Reclaimed<K, V>) {
        let _g = self.reentrancy.enter("advance");
        let (next, out) = self.chain.step(from.map(Handle::raw));
        (next.map(Handle), out)
    }

    /// Release a cursor pin taken by [`advance`](Self::advance).
    pub(crate) fn unpin(&mut self, h: Handle) -> Reclaimed<K, V> {
        let _g = self.reentrancy.enter("unpin");
        let mut out = Reclaimed::new();
        self.chain.release(h.raw(), &mut out);
        out
    }

    /// Key and value of a pinned entry, live or not.
    pub(crate) fn pinned(&self, h: Handle) -> (&K, &V) {
        let slot = &self.chain.slots[h.raw()];
        debug_assert!(slot.refs > 0, "entry is not pinned");
        (&slot.key, &slot.value)
    }
}
