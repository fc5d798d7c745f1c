//! # Event arguments and the cancellation stamp.
//!
//! Single-argument events carry a payload implementing [`EventArgs`]. The
//! dispatcher writes the invocation's [`CancellationToken`] into the payload
//! exactly once, before any callback starts, and then shares the payload as
//! `Arc<A>`: subscribers can read the token but never replace it.
//!
//! [`EventContext<T>`] is the ready-made payload wrapper; implement
//! [`EventArgs`] on your own type when the payload is a custom struct.
//!
//! ## Example
//! ```rust
//! use asyncfan::{EventArgs, EventContext};
//!
//! struct Message { text: String }
//!
//! let ctx = EventContext::new(Message { text: "hello".into() });
//! assert_eq!(ctx.text, "hello");
//! assert!(!ctx.cancellation_token().is_cancelled());
//! ```

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Optional, type-erased source of an event.
///
/// Subscribers that care about the sender downcast it with
/// [`Any::downcast_ref`].
pub type Sender = Arc<dyn Any + Send + Sync>;

/// Event payload with a cancellation field stamped by the dispatcher.
pub trait EventArgs: Send + Sync + 'static {
    /// Token of the invocation this payload was delivered with.
    ///
    /// Before the payload is dispatched it holds a token that never fires.
    fn cancellation_token(&self) -> &CancellationToken;

    /// Stamps the invocation token. Called by the dispatcher once per invocation.
    fn set_cancellation_token(&mut self, token: CancellationToken);
}

/// Generic [`EventArgs`] wrapper around any payload.
///
/// Dereferences to the payload.
#[derive(Clone, Default)]
pub struct EventContext<T> {
    data: T,
    token: CancellationToken,
}

impl<T> EventContext<T> {
    /// Wraps `data` with an unstamped (never-cancelled) token.
    pub fn new(data: T) -> Self {
        Self {
            data,
            token: CancellationToken::new(),
        }
    }

    /// Returns the payload.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Shorthand for `cancellation_token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Unwraps the payload, dropping the token.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> From<T> for EventContext<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T> Deref for EventContext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for EventContext<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for EventContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("data", &self.data)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<T: Send + Sync + 'static> EventArgs for EventContext<T> {
    fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.token = token;
    }
}

/// Input delivered to single-argument callbacks.
///
/// Cheap to clone: both fields are reference-counted.
pub struct EventInput<A> {
    /// Source of the event, if the producer supplied one.
    pub sender: Option<Sender>,
    /// Stamped event arguments shared by every subscriber of the invocation.
    pub args: Arc<A>,
}

impl<A> EventInput<A> {
    /// Bundles a sender and arguments.
    pub fn new(sender: Option<Sender>, args: Arc<A>) -> Self {
        Self { sender, args }
    }
}

impl<A> Clone for EventInput<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            args: Arc::clone(&self.args),
        }
    }
}

impl<A> fmt::Debug for EventInput<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInput")
            .field("has_sender", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}
