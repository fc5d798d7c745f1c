//! # Weak callback registry.
//!
//! [`WeakCallbackRegistry`] associates at most one callback with each owner.
//! The owner is held only through a [`Weak`] reference, so a registration
//! never keeps its owner alive.
//!
//! ## Architecture
//! ```text
//! register(&Arc<Owner>, cb)
//!     │
//!     └─► key = address of the owner's allocation
//!         entry = { probe: Weak<Owner>, callback }   (add-or-replace)
//!
//! snapshot()
//!     ├─► probe alive  ─► callback copied
//!     └─► probe dead   ─► entry evicted (not an error)
//! ```
//!
//! ## Rules
//! - The stored `Weak` pins the owner's allocation, so its address cannot be
//!   reused by another owner while the entry exists.
//! - A dead owner's entry is logically absent; it is physically removed on
//!   the next [`snapshot`](WeakCallbackRegistry::snapshot) or
//!   [`purge`](WeakCallbackRegistry::purge).
//! - Replaced and evicted entries are dropped after the lock is released.
//! - Owners that want eager removal call
//!   [`unregister`](WeakCallbackRegistry::unregister) from their own teardown.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::callbacks::Callback;

/// Identity of an owner: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OwnerKey(usize);

impl OwnerKey {
    fn of<O: ?Sized>(owner: &Arc<O>) -> Self {
        Self(Arc::as_ptr(owner) as *const () as usize)
    }
}

/// Synchronous "is the owner still alive" check.
trait Liveness: Send + Sync {
    fn is_alive(&self) -> bool;
}

impl<O: ?Sized + Send + Sync> Liveness for Weak<O> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

struct WeakEntry<In> {
    owner: Box<dyn Liveness>,
    callback: Arc<dyn Callback<In>>,
}

/// Thread-safe registry of callbacks keyed by a non-owning owner handle.
pub struct WeakCallbackRegistry<In> {
    entries: Mutex<HashMap<OwnerKey, WeakEntry<In>>>,
}

impl<In: 'static> WeakCallbackRegistry<In> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Associates `callback` with `owner`, replacing any previous callback of that owner.
    pub fn register<O>(&self, owner: &Arc<O>, callback: Arc<dyn Callback<In>>)
    where
        O: ?Sized + Send + Sync + 'static,
    {
        let key = OwnerKey::of(owner);
        let name = callback.name().to_string();
        let entry = WeakEntry {
            owner: Box::new(Arc::downgrade(owner)),
            callback,
        };

        let replaced = self.entries.lock().insert(key, entry);
        trace!(
            owner = key.0,
            callback = %name,
            replaced = replaced.is_some(),
            "weak callback registered"
        );
    }

    /// Removes the owner's callback. Returns `true` if one was registered.
    pub fn unregister<O>(&self, owner: &Arc<O>) -> bool
    where
        O: ?Sized,
    {
        let key = OwnerKey::of(owner);
        let removed = self.entries.lock().remove(&key);
        trace!(owner = key.0, removed = removed.is_some(), "weak callback unregistered");
        removed.is_some()
    }

    /// True if `owner` currently has a callback registered.
    pub fn contains<O>(&self, owner: &Arc<O>) -> bool
    where
        O: ?Sized,
    {
        self.entries.lock().contains_key(&OwnerKey::of(owner))
    }

    /// Copies the callbacks of live owners, evicting entries whose owner is gone.
    pub fn snapshot(&self) -> Vec<Arc<dyn Callback<In>>> {
        let mut entries = self.entries.lock();
        let evicted = evict_dead(&mut entries);
        let snapshot = entries
            .values()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();
        drop(entries);

        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "evicted callbacks of dropped owners");
        }
        snapshot
    }

    /// Evicts entries whose owner is gone without invoking anything.
    ///
    /// Returns the number of evicted entries.
    pub fn purge(&self) -> usize {
        let evicted = evict_dead(&mut self.entries.lock());
        evicted.len()
    }

    /// Number of stored entries, including dead owners not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.entries.lock());
        trace!(removed = drained.len(), "weak registry cleared");
    }
}

/// Moves dead-owner entries out of the map so the caller can drop them unlocked.
fn evict_dead<In>(entries: &mut HashMap<OwnerKey, WeakEntry<In>>) -> Vec<WeakEntry<In>> {
    let dead: Vec<OwnerKey> = entries
        .iter()
        .filter(|(_, entry)| !entry.owner.is_alive())
        .map(|(key, _)| *key)
        .collect();
    dead.iter().filter_map(|key| entries.remove(key)).collect()
}

impl<In: 'static> Default for WeakCallbackRegistry<In> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: 'static> fmt::Debug for WeakCallbackRegistry<In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{CallbackFn, NotifyCallback};
    use crate::error::SubscriberError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_util::sync::CancellationToken;

    struct Owner;

    fn noop(name: &'static str) -> NotifyCallback {
        CallbackFn::arc(name, |_t: CancellationToken| async {
            Ok::<_, SubscriberError>(())
        })
    }

    #[test]
    fn register_replaces_per_owner() {
        let reg = WeakCallbackRegistry::new();
        let owner = Arc::new(Owner);

        reg.register(&owner, noop("first"));
        reg.register(&owner, noop("second"));

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name(), "second");
    }

    #[test]
    fn registration_does_not_keep_owner_alive() {
        let reg = WeakCallbackRegistry::new();
        let owner = Arc::new(Owner);
        reg.register(&owner, noop("a"));

        assert_eq!(Arc::strong_count(&owner), 1);
        assert_eq!(Arc::weak_count(&owner), 1);
    }

    #[test]
    fn dead_owner_is_evicted_on_snapshot() {
        let reg = WeakCallbackRegistry::new();
        let alive = Arc::new(Owner);
        let doomed = Arc::new(Owner);
        reg.register(&alive, noop("alive"));
        reg.register(&doomed, noop("doomed"));

        drop(doomed);
        assert_eq!(reg.len(), 2);

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name(), "alive");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn purge_reports_evicted_count() {
        let reg = WeakCallbackRegistry::new();
        let owners: Vec<_> = (0..3).map(|_| Arc::new(Owner)).collect();
        for o in &owners {
            reg.register(o, noop("x"));
        }
        let keep = Arc::clone(&owners[0]);
        drop(owners);

        assert_eq!(reg.purge(), 2);
        assert_eq!(reg.purge(), 0);
        assert!(reg.contains(&keep));
    }

    #[test]
    fn unregister_reports_presence() {
        let reg = WeakCallbackRegistry::new();
        let owner = Arc::new(Owner);
        let stranger = Arc::new(Owner);
        reg.register(&owner, noop("a"));

        assert!(!reg.unregister(&stranger));
        assert!(reg.unregister(&owner));
        assert!(!reg.unregister(&owner));
        assert!(reg.is_empty());
    }

    /// Calls back into the registry when the callback holding it is dropped.
    struct Reenter {
        reg: Arc<WeakCallbackRegistry<CancellationToken>>,
        target: Arc<Owner>,
        ran: Arc<AtomicBool>,
    }

    impl Drop for Reenter {
        fn drop(&mut self) {
            self.reg.unregister(&self.target);
            self.ran.store(true, Ordering::SeqCst);
        }
    }

    fn holding(guard: Reenter) -> NotifyCallback {
        CallbackFn::arc("holder", move |_t: CancellationToken| {
            let _keep = &guard;
            async { Ok::<_, SubscriberError>(()) }
        })
    }

    fn reentrant_setup() -> (
        Arc<WeakCallbackRegistry<CancellationToken>>,
        Arc<Owner>,
        Arc<AtomicBool>,
    ) {
        let reg = Arc::new(WeakCallbackRegistry::new());
        let doomed = Arc::new(Owner);
        let target = Arc::new(Owner);
        let ran = Arc::new(AtomicBool::new(false));
        reg.register(&target, noop("target"));
        reg.register(
            &doomed,
            holding(Reenter {
                reg: Arc::clone(&reg),
                target: Arc::clone(&target),
                ran: Arc::clone(&ran),
            }),
        );
        drop(doomed);
        (reg, target, ran)
    }

    #[test]
    fn evicted_callback_is_dropped_after_unlock() {
        let (reg, target, ran) = reentrant_setup();

        assert_eq!(reg.snapshot().len(), 1);
        assert!(ran.load(Ordering::SeqCst));
        assert!(!reg.contains(&target));
        assert!(reg.is_empty());
    }

    #[test]
    fn purged_callback_is_dropped_after_unlock() {
        let (reg, target, ran) = reentrant_setup();

        assert_eq!(reg.purge(), 1);
        assert!(ran.load(Ordering::SeqCst));
        assert!(!reg.contains(&target));
    }

    #[test]
    fn replaced_callback_is_dropped_after_unlock() {
        let reg = Arc::new(WeakCallbackRegistry::new());
        let owner = Arc::new(Owner);
        let target = Arc::new(Owner);
        let ran = Arc::new(AtomicBool::new(false));
        reg.register(&target, noop("target"));
        reg.register(
            &owner,
            holding(Reenter {
                reg: Arc::clone(&reg),
                target: Arc::clone(&target),
                ran: Arc::clone(&ran),
            }),
        );

        reg.register(&owner, noop("replacement"));
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(&owner));
    }

    #[test]
    fn distinct_owner_types_share_one_registry() {
        let reg = WeakCallbackRegistry::new();
        let text: Arc<str> = Arc::from("owner");
        let number = Arc::new(42u64);
        reg.register(&text, noop("text"));
        reg.register(&number, noop("number"));

        assert_eq!(reg.snapshot().len(), 2);
        assert!(reg.unregister(&text));
        assert!(reg.contains(&number));
    }
}
