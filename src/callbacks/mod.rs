//! # Callback abstractions.
//!
//! - [`Callback`] - trait for async subscriber callbacks, generic over the input shape
//! - [`CallbackFn`] - closure-backed implementation
//! - [`NotifyCallback`], [`EventCallback`] - shared handles for the two event shapes

mod callback;
mod callback_fn;

pub use callback::{Callback, EventCallback, NotifyCallback};
pub use callback_fn::CallbackFn;
