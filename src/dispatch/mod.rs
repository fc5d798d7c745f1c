//! # Event dispatchers.
//!
//! | Dispatcher              | Callback input                | Registry                   |
//! |-------------------------|-------------------------------|----------------------------|
//! | [`Notifier`]            | `CancellationToken`           | strong, token per callback |
//! | [`WeakNotifier`]        | `CancellationToken`           | weak, one callback per owner |
//! | [`EventHandler<A>`]     | `Option<Sender>`, `Arc<A>`    | strong, token per callback |
//! | [`WeakEventHandler<A>`] | `Option<Sender>`, `Arc<A>`    | weak, one callback per owner |
//!
//! All four share one invocation protocol (see `fan_out`): pre-check the token,
//! stamp it into the arguments, snapshot the registry, start callbacks
//! concurrently until cancellation is observed, join, and aggregate failures.

mod fan_out;
mod handler;
mod notifier;

pub use handler::{EventHandler, WeakEventHandler};
pub use notifier::{Notifier, WeakNotifier};

use crate::config::Config;

/// State shared by all clones of one dispatcher; built eagerly at construction.
struct Inner<R> {
    registry: R,
    config: Config,
}
