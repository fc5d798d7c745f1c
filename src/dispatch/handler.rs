//! # Single-argument events.
//!
//! [`EventHandler<A>`] and [`WeakEventHandler<A>`] fire callbacks that receive
//! an optional sender plus the event arguments `A`.
//!
//! Before any callback starts, the invocation token is stamped into the
//! arguments through [`EventArgs::set_cancellation_token`]; the arguments are
//! then shared as `Arc<A>`, so callbacks read the token from
//! [`EventArgs::cancellation_token`] and cannot replace it.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::callbacks::{CallbackFn, EventCallback};
use crate::config::Config;
use crate::dispatch::fan_out::{ensure_not_cancelled, fan_out};
use crate::dispatch::Inner;
use crate::error::{InvokeError, SubscriberError};
use crate::events::{EventArgs, EventInput, Sender};
use crate::registry::{CallbackRegistry, SubscriptionId, WeakCallbackRegistry};

/// Stamps the token and freezes the arguments for sharing.
fn stamp<A: EventArgs>(mut args: A, token: &CancellationToken) -> Arc<A> {
    args.set_cancellation_token(token.clone());
    Arc::new(args)
}

/// # Single-argument event with strongly-held callbacks.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use asyncfan::{EventContext, EventHandler, Sender, SubscriberError};
///
/// struct ClientConnected { client_id: u32 }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let connected: EventHandler<EventContext<ClientConnected>> = EventHandler::new();
/// connected.register_fn("greeter", |_sender: Option<Sender>, e: Arc<EventContext<ClientConnected>>| async move {
///     println!("client connected: {}", e.client_id);
///     Ok::<_, SubscriberError>(())
/// });
///
/// let args = EventContext::new(ClientConnected { client_id: 1 });
/// connected.invoke(None, args, &CancellationToken::new()).await.unwrap();
/// # }
/// ```
pub struct EventHandler<A> {
    inner: Arc<Inner<CallbackRegistry<EventInput<A>>>>,
}

impl<A: EventArgs> EventHandler<A> {
    /// Creates a handler with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a handler with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: CallbackRegistry::new(config.duplicates),
                config,
            }),
        }
    }

    /// Subscribes a callback and returns its token.
    pub fn register(&self, callback: EventCallback<A>) -> SubscriptionId {
        self.inner.registry.register(callback)
    }

    /// Subscribes a closure under `name`. Always a new subscription.
    pub fn register_fn<F, Fut>(&self, name: impl Into<Cow<'static, str>>, f: F) -> SubscriptionId
    where
        F: Fn(Option<Sender>, Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
    {
        self.register(CallbackFn::arc(name, f))
    }

    /// Unsubscribes. Returns `false` if the token was not registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.inner.registry.unregister(id)
    }

    /// Unsubscribes the earliest subscription of this exact `Arc`.
    ///
    /// Pairs with [`DuplicatePolicy::Collapse`](crate::DuplicatePolicy::Collapse),
    /// where a callback has at most one subscription.
    pub fn unregister_callback(&self, callback: &EventCallback<A>) -> bool {
        self.inner.registry.unregister_callback(callback)
    }

    /// True if the token is currently subscribed.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// True if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.inner.registry.clear();
    }

    /// Configuration this handler was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Invokes every subscribed callback concurrently with `sender` and `args`.
    ///
    /// `args` is stamped with `token` before any callback starts.
    ///
    /// # Panics
    /// With [`FanOutMode::Spawn`](crate::FanOutMode::Spawn) (the default), panics
    /// if called outside a tokio runtime, like `tokio::spawn`.
    pub async fn invoke(
        &self,
        sender: Option<Sender>,
        args: A,
        token: &CancellationToken,
    ) -> Result<(), InvokeError> {
        let event = self.inner.config.name.as_ref();
        ensure_not_cancelled(event, token)?;
        let args = stamp(args, token);
        let snapshot = self.inner.registry.snapshot();
        let input = EventInput::new(sender, args);
        fan_out(event, snapshot, input, token, self.inner.config.fan_out).await
    }

    /// Invokes with a token that is never cancelled.
    ///
    /// Panics under the same conditions as `invoke`.
    pub async fn invoke_default(&self, sender: Option<Sender>, args: A) -> Result<(), InvokeError> {
        self.invoke(sender, args, &CancellationToken::new()).await
    }
}

impl<A> Clone for EventHandler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: EventArgs> Default for EventHandler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for EventHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("name", &self.inner.config.name)
            .field("subscribers", &self.inner.registry.len())
            .finish()
    }
}

/// # Single-argument event whose callbacks are bound to weakly-held owners.
///
/// One callback per owner; registering again replaces it. Callbacks of
/// dropped owners are skipped and evicted on the next invocation.
pub struct WeakEventHandler<A> {
    inner: Arc<Inner<WeakCallbackRegistry<EventInput<A>>>>,
}

impl<A: EventArgs> WeakEventHandler<A> {
    /// Creates a weak handler with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a weak handler with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: WeakCallbackRegistry::new(),
                config,
            }),
        }
    }

    /// Binds `callback` to `owner`, replacing the owner's previous callback.
    pub fn register<O>(&self, owner: &Arc<O>, callback: EventCallback<A>)
    where
        O: ?Sized + Send + Sync + 'static,
    {
        self.inner.registry.register(owner, callback);
    }

    /// Binds a closure to `owner` under `name`.
    pub fn register_fn<O, F, Fut>(&self, owner: &Arc<O>, name: impl Into<Cow<'static, str>>, f: F)
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(Option<Sender>, Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
    {
        self.register(owner, CallbackFn::arc(name, f));
    }

    /// Removes the owner's callback. Returns `true` if one was registered.
    pub fn unregister<O: ?Sized>(&self, owner: &Arc<O>) -> bool {
        self.inner.registry.unregister(owner)
    }

    /// True if `owner` has a callback registered.
    pub fn contains<O: ?Sized>(&self, owner: &Arc<O>) -> bool {
        self.inner.registry.contains(owner)
    }

    /// Evicts callbacks of dropped owners. Returns how many were evicted.
    pub fn purge(&self) -> usize {
        self.inner.registry.purge()
    }

    /// Number of stored registrations, including dropped owners not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// True if no registrations are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Configuration this handler was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Invokes the callbacks of every live owner with `sender` and `args`.
    ///
    /// # Panics
    /// With [`FanOutMode::Spawn`](crate::FanOutMode::Spawn) (the default), panics
    /// if called outside a tokio runtime, like `tokio::spawn`.
    pub async fn invoke(
        &self,
        sender: Option<Sender>,
        args: A,
        token: &CancellationToken,
    ) -> Result<(), InvokeError> {
        let event = self.inner.config.name.as_ref();
        ensure_not_cancelled(event, token)?;
        let args = stamp(args, token);
        let snapshot = self.inner.registry.snapshot();
        let input = EventInput::new(sender, args);
        fan_out(event, snapshot, input, token, self.inner.config.fan_out).await
    }

    /// Invokes with a token that is never cancelled.
    ///
    /// Panics under the same conditions as `invoke`.
    pub async fn invoke_default(&self, sender: Option<Sender>, args: A) -> Result<(), InvokeError> {
        self.invoke(sender, args, &CancellationToken::new()).await
    }
}

impl<A> Clone for WeakEventHandler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: EventArgs> Default for WeakEventHandler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for WeakEventHandler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventHandler")
            .field("name", &self.inner.config.name)
            .field("registrations", &self.inner.registry.len())
            .finish()
    }
}
