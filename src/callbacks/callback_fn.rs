//! # Function-backed callback (`CallbackFn`)
//!
//! [`CallbackFn`] wraps a closure producing a fresh future per invocation.
//! The closure is `Fn`, not `FnMut`: there is no hidden mutation between
//! invocations; if shared state is needed, capture an `Arc<...>` explicitly.
//!
//! Two closure shapes are accepted:
//! - `Fn(CancellationToken) -> Fut` implements [`Callback<CancellationToken>`];
//! - `Fn(Option<Sender>, Arc<A>) -> Fut` implements [`Callback<EventInput<A>>`].
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use asyncfan::{CallbackFn, NotifyCallback, SubscriberError};
//!
//! let cb: NotifyCallback = CallbackFn::arc("started", |_token: CancellationToken| async move {
//!     Ok::<_, SubscriberError>(())
//! });
//!
//! assert_eq!(cb.name(), "started");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::callbacks::Callback;
use crate::error::SubscriberError;
use crate::events::{EventInput, Sender};

/// Function-backed callback implementation.
pub struct CallbackFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CallbackFn<F> {
    /// Creates a new function-backed callback.
    ///
    /// Prefer [`CallbackFn::arc`] when you immediately need a shared handle.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the callback and returns it behind an `Arc`.
    ///
    /// The same `Arc` registered twice is one identity under
    /// [`DuplicatePolicy::Collapse`](crate::DuplicatePolicy::Collapse).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for CallbackFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Callback<CancellationToken> for CallbackFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, token: CancellationToken) -> Result<(), SubscriberError> {
        (self.f)(token).await
    }
}

#[async_trait]
impl<A, F, Fut> Callback<EventInput<A>> for CallbackFn<F>
where
    A: Send + Sync + 'static,
    F: Fn(Option<Sender>, Arc<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, input: EventInput<A>) -> Result<(), SubscriberError> {
        (self.f)(input.sender, input.args).await
    }
}
