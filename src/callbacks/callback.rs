//! # Callback abstraction.
//!
//! A [`Callback`] is the unit a dispatcher fans out to. It is generic over its
//! input so the same trait serves both event shapes:
//!
//! - zero-argument events pass a [`CancellationToken`](tokio_util::sync::CancellationToken);
//! - single-argument events pass an [`EventInput<A>`](crate::EventInput)
//!   (optional sender plus the stamped event arguments).
//!
//! Closures are wrapped with [`CallbackFn`](crate::CallbackFn); implement the
//! trait directly when the subscriber is a stateful struct.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubscriberError;
use crate::events::EventInput;

/// # Asynchronous subscriber callback.
///
/// Each invocation calls [`call`](Callback::call) with a fresh clone of the
/// input. Callbacks run concurrently with each other and must not assume any
/// ordering relative to other subscribers.
///
/// ### Implementation requirements
/// - Check the cancellation token cooperatively; nothing aborts a running callback.
/// - Report failures through the returned `Result`; panics are caught, but
///   are still reported as [`SubscriberError::Panicked`].
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use asyncfan::{Callback, SubscriberError};
///
/// struct Flush;
///
/// #[async_trait]
/// impl Callback<CancellationToken> for Flush {
///     fn name(&self) -> &str { "flush" }
///
///     async fn call(&self, token: CancellationToken) -> Result<(), SubscriberError> {
///         if token.is_cancelled() {
///             return Err(SubscriberError::Canceled);
///         }
///         // flush buffers...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Callback<In>: Send + Sync + 'static {
    /// Returns the name used in logs and in [`SubscriberFailure`](crate::SubscriberFailure).
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs the callback for one invocation.
    async fn call(&self, input: In) -> Result<(), SubscriberError>;
}

/// Shared handle to a zero-argument callback.
pub type NotifyCallback = Arc<dyn Callback<CancellationToken>>;

/// Shared handle to a single-argument callback for event arguments `A`.
pub type EventCallback<A> = Arc<dyn Callback<EventInput<A>>>;
