//! # Strong callback registry.
//!
//! [`CallbackRegistry`] owns its callbacks and addresses them by
//! [`SubscriptionId`]. All mutation and every snapshot go through one mutex;
//! the lock is never held while a callback runs.
//!
//! ## Rules
//! - `register` always returns a token; under [`DuplicatePolicy::Collapse`] a
//!   repeated `Arc` returns the token it already has.
//! - `unregister` of an unknown token is a no-op returning `false`.
//! - Removed callbacks are dropped after the lock is released, so a callback's
//!   `Drop` may call back into the registry.
//! - `snapshot` returns an independent copy in registration order; later
//!   mutation never affects an invocation that already took its snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::callbacks::Callback;
use crate::config::DuplicatePolicy;

/// Global counter for subscription tokens.
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Opaque token identifying one subscription in a strong registry.
///
/// Tokens are unique for the lifetime of the process and grow monotonically,
/// so they also record registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw numeric value, for logs.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Thread-safe registry of strongly-held callbacks.
pub struct CallbackRegistry<In> {
    entries: Mutex<BTreeMap<SubscriptionId, Arc<dyn Callback<In>>>>,
    duplicates: DuplicatePolicy,
}

impl<In: 'static> CallbackRegistry<In> {
    /// Creates an empty registry with the given duplicate policy.
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            duplicates,
        }
    }

    /// Adds a callback and returns its token.
    pub fn register(&self, callback: Arc<dyn Callback<In>>) -> SubscriptionId {
        let mut entries = self.entries.lock();

        if self.duplicates == DuplicatePolicy::Collapse {
            let existing = entries
                .iter()
                .find(|(_, cb)| same_callback(cb, &callback))
                .map(|(id, _)| *id);
            if let Some(id) = existing {
                trace!(id = %id, callback = callback.name(), "duplicate registration collapsed");
                return id;
            }
        }

        let id = SubscriptionId::next();
        trace!(id = %id, callback = callback.name(), "callback registered");
        entries.insert(id, callback);
        id
    }

    /// Removes a subscription. Returns `false` if the token was not registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        // Bound to a local so the callback is dropped after the guard.
        let removed = self.entries.lock().remove(&id);
        trace!(id = %id, removed = removed.is_some(), "callback unregistered");
        removed.is_some()
    }

    /// Removes the earliest subscription of this exact `Arc`.
    ///
    /// Under [`DuplicatePolicy::Collapse`] there is at most one such
    /// subscription; under [`DuplicatePolicy::Allow`] the others stay registered.
    /// Returns `false` if the callback was not registered.
    pub fn unregister_callback(&self, callback: &Arc<dyn Callback<In>>) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            let id = entries
                .iter()
                .find(|(_, cb)| same_callback(cb, callback))
                .map(|(id, _)| *id);
            match id {
                Some(id) => entries.remove(&id).map(|cb| (id, cb)),
                None => None,
            }
        };
        match removed {
            Some((id, _)) => {
                trace!(id = %id, callback = callback.name(), "callback unregistered by identity");
                true
            }
            None => false,
        }
    }

    /// True if the token is currently registered.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Copies the current callbacks in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Callback<In>>> {
        self.entries.lock().values().cloned().collect()
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.entries.lock());
        trace!(removed = drained.len(), "registry cleared");
    }

    /// Duplicate policy this registry was built with.
    pub fn duplicates(&self) -> DuplicatePolicy {
        self.duplicates
    }
}

impl<In: 'static> Default for CallbackRegistry<In> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl<In: 'static> fmt::Debug for CallbackRegistry<In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .field("duplicates", &self.duplicates)
            .finish()
    }
}

/// Pointer identity, ignoring vtable metadata.
fn same_callback<In: 'static>(a: &Arc<dyn Callback<In>>, b: &Arc<dyn Callback<In>>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
