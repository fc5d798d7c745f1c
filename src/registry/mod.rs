//! # Callback registries.
//!
//! - [`CallbackRegistry`] strong registry addressed by [`SubscriptionId`]
//! - [`WeakCallbackRegistry`] one callback per owner, owner held weakly
//!
//! Both guard their storage with a single mutex held only for mutation and
//! for the snapshot copy.

mod strong;
mod weak;

pub use strong::{CallbackRegistry, SubscriptionId};
pub use weak::WeakCallbackRegistry;
