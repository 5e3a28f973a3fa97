//! live-ordered-map: insertion-ordered Map and Set containers keyed by
//! identity, with iterators that stay valid while the container changes.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keys of any type, including reference types compared by
//!   identity, with insertion-ordered traversal that tolerates insertion,
//!   deletion and clearing in the middle of a walk.
//! - Layers:
//!   - `IdentityKey` (identity.rs): derives a hashable `Token` from a key.
//!     Primitives compare by value, shared allocations by address.
//!   - `EntryStore<K, V, S>` (entry_store.rs): slotmap arena of entries
//!     linked in insertion order plus a hashbrown index. Removal
//!     tombstones entries and reclaims them once nothing refers to them.
//!   - `Cursor` (live_iter.rs): a resumable position that pins the last
//!     entry it returned.
//!   - `OrderedMap` / `OrderedSet`: shared handles over one store.
//!   - `Realm` (script.rs) and `Value` (value.rs): a dynamically-typed
//!     binding that adds the argument checks a script caller needs.
//!
//! Constraints
//! - Single-threaded: containers and iterators are `!Send`/`!Sync`.
//! - Stable, generational slot keys behind a small `Handle` wrapper.
//! - O(1) average lookup, insert and delete. Clear is O(n).
//! - Lookups (`has`, `get`, `delete`) never mutates the caller's key.
//!
//! Iteration
//! - A cursor remembers the last entry it yielded and holds a pin on it.
//!   If that entry is deleted it becomes a tombstone that keeps its `prev`
//!   link. The next step walks back through tombstones to the nearest live
//!   entry and continues from its successor, or from the head if none is
//!   left.
//! - The effect: each step yields the first live entry inserted after the
//!   last one yielded. Deleted entries are never yielded, entries appended
//!   before the walk reaches the end are, and after `clear` a walk resumes
//!   with entries added later.
//! - A finished cursor drops its handle and stays finished.
//!
//! Reclamation
//! - Each slot counts parked cursors plus tombstones whose `prev` names it.
//!   A tombstone is freed when its count reaches zero, which releases its
//!   own `prev` in turn. With no cursor parked there are no tombstones.
//! - Freed keys and values are returned to the caller as `Reclaimed` and
//!   dropped after the store borrow ends, so their `Drop` may reenter the
//!   container.
//!
//! Reentrancy policy and interior mutability
//! - Containers wrap the store in `Rc<RefCell<_>>` and borrow it only for
//!   the duration of one store operation. User callbacks (`for_each`, code
//!   running between iterator steps) see no outstanding borrow and may
//!   mutate the container.
//! - `EntryStore` carries a debug-only reentrancy guard at each structural
//!   entry point. The only user code it runs is `IdentityKey::token` and
//!   the hasher; reentering from there panics in debug builds.
//!
//! Hasher
//! - Each entry stores its hash; the index is rebuilt from stored hashes
//!   on growth, so `token` is not called during a resize.
//!
//! Notes and non-goals
//! - No weak keys: a stored key keeps its referent alive.
//! - No thread safety.
//! - Cycles through `Rc` (a map stored inside itself) are not collected.

mod entry_store;
#[cfg(test)]
mod entry_store_proptest;
pub mod error;
mod identity;
mod live_iter;
mod ordered_map;
mod ordered_set;
mod reentrancy;
pub mod script;
pub mod value;

// Public surface
pub use entry_store::{EntryStore, Handle, Iter, Reclaimed, Upsert};
pub use error::{Error, Result};
pub use identity::{number_bits, IdentityKey, Token};
pub use live_iter::{Entries, Keys, SetEntries, SetValues, Values};
pub use ordered_map::OrderedMap;
pub use ordered_set::OrderedSet;
pub use script::{Invocation, Realm, ScriptMap, ScriptSet, UnboundThis};
pub use value::{Function, Object, Value};
