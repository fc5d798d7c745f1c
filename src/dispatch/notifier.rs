//! # Zero-argument events.
//!
//! [`Notifier`] and [`WeakNotifier`] fire callbacks that receive only the
//! invocation's [`CancellationToken`].
//!
//! Both are cheap `Clone` handles: clones share one registry, so a callback
//! registered through any clone is invoked by every clone.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::callbacks::{CallbackFn, NotifyCallback};
use crate::config::Config;
use crate::dispatch::fan_out::{ensure_not_cancelled, fan_out};
use crate::dispatch::Inner;
use crate::error::{InvokeError, SubscriberError};
use crate::registry::{CallbackRegistry, SubscriptionId, WeakCallbackRegistry};

/// # Zero-argument event with strongly-held callbacks.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use asyncfan::{Notifier, SubscriberError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let started = Notifier::new();
/// let id = started.register_fn("log", |_token: CancellationToken| async {
///     println!("server started");
///     Ok::<_, SubscriberError>(())
/// });
///
/// started.invoke(&CancellationToken::new()).await.unwrap();
/// assert!(started.unregister(id));
/// # }
/// ```
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner<CallbackRegistry<CancellationToken>>>,
}

impl Notifier {
    /// Creates a notifier with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a notifier with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: CallbackRegistry::new(config.duplicates),
                config,
            }),
        }
    }

    /// Subscribes a callback and returns its token.
    pub fn register(&self, callback: NotifyCallback) -> SubscriptionId {
        self.inner.registry.register(callback)
    }

    /// Subscribes a closure under `name`.
    ///
    /// Each call wraps the closure in a new `Arc`, so it is always a new
    /// subscription regardless of [`DuplicatePolicy`](crate::DuplicatePolicy).
    pub fn register_fn<F, Fut>(&self, name: impl Into<Cow<'static, str>>, f: F) -> SubscriptionId
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
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
    pub fn unregister_callback(&self, callback: &NotifyCallback) -> bool {
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

    /// Configuration this notifier was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Invokes every subscribed callback concurrently.
    ///
    /// Resolves once all started callbacks have finished. See
    /// [`InvokeError`] for the failure outcomes.
    ///
    /// # Panics
    /// With [`FanOutMode::Spawn`](crate::FanOutMode::Spawn) (the default), panics
    /// if called outside a tokio runtime, like `tokio::spawn`.
    pub async fn invoke(&self, token: &CancellationToken) -> Result<(), InvokeError> {
        let event = self.inner.config.name.as_ref();
        ensure_not_cancelled(event, token)?;
        let snapshot = self.inner.registry.snapshot();
        fan_out(event, snapshot, token.clone(), token, self.inner.config.fan_out).await
    }

    /// Invokes with a token that is never cancelled.
    ///
    /// Panics under the same conditions as `invoke`.
    pub async fn invoke_default(&self) -> Result<(), InvokeError> {
        self.invoke(&CancellationToken::new()).await
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("name", &self.inner.config.name)
            .field("subscribers", &self.inner.registry.len())
            .finish()
    }
}

/// # Zero-argument event whose callbacks are bound to weakly-held owners.
///
/// Each owner has at most one callback; registering again replaces it. Once
/// the owner is dropped, its callback stops being invoked.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use asyncfan::{SubscriberError, WeakNotifier};
///
/// struct Session;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tick = WeakNotifier::new();
/// let session = Arc::new(Session);
/// tick.register_fn(&session, "session-tick", |_token: CancellationToken| async {
///     Ok::<_, SubscriberError>(())
/// });
///
/// drop(session);
/// tick.invoke_default().await.unwrap();
/// assert!(tick.is_empty());
/// # }
/// ```
#[derive(Clone)]
pub struct WeakNotifier {
    inner: Arc<Inner<WeakCallbackRegistry<CancellationToken>>>,
}

impl WeakNotifier {
    /// Creates a weak notifier with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a weak notifier with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: WeakCallbackRegistry::new(),
                config,
            }),
        }
    }

    /// Binds `callback` to `owner`, replacing the owner's previous callback.
    pub fn register<O>(&self, owner: &Arc<O>, callback: NotifyCallback)
    where
        O: ?Sized + Send + Sync + 'static,
    {
        self.inner.registry.register(owner, callback);
    }

    /// Binds a closure to `owner` under `name`.
    pub fn register_fn<O, F, Fut>(&self, owner: &Arc<O>, name: impl Into<Cow<'static, str>>, f: F)
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
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

    /// Configuration this notifier was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Invokes the callbacks of every live owner concurrently.
    ///
    /// Callbacks of dropped owners are skipped and evicted; that is not an error.
    ///
    /// # Panics
    /// With [`FanOutMode::Spawn`](crate::FanOutMode::Spawn) (the default), panics
    /// if called outside a tokio runtime, like `tokio::spawn`.
    pub async fn invoke(&self, token: &CancellationToken) -> Result<(), InvokeError> {
        let event = self.inner.config.name.as_ref();
        ensure_not_cancelled(event, token)?;
        let snapshot = self.inner.registry.snapshot();
        fan_out(event, snapshot, token.clone(), token, self.inner.config.fan_out).await
    }

    /// Invokes with a token that is never cancelled.
    ///
    /// Panics under the same conditions as `invoke`.
    pub async fn invoke_default(&self) -> Result<(), InvokeError> {
        self.invoke(&CancellationToken::new()).await
    }
}

impl Default for WeakNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WeakNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNotifier")
            .field("name", &self.inner.config.name)
            .field("registrations", &self.inner.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::callbacks::Callback;
    use crate::config::{DuplicatePolicy, FanOutMode};

    fn counter() -> (Arc<AtomicUsize>, NotifyCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let cb: NotifyCallback = CallbackFn::arc("counter", move |_t: CancellationToken| {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SubscriberError>(())
            }
        });
        (hits, cb)
    }

    #[tokio::test]
    async fn no_subscribers_succeeds_immediately() {
        let n = Notifier::new();
        assert_eq!(n.invoke_default().await, Ok(()));

        let w = WeakNotifier::new();
        assert_eq!(w.invoke_default().await, Ok(()));
    }

    #[tokio::test]
    async fn pre_cancelled_token_runs_nothing() {
        let n = Notifier::new();
        let (hits, cb) = counter();
        n.register(cb);

        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(n.invoke(&token).await, Err(InvokeError::PreCancelled));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callbacks_see_the_invocation_token() {
        let n = Notifier::new();
        let token = CancellationToken::new();
        let expected = token.clone();
        n.register_fn("observer", move |t: CancellationToken| {
            let expected = expected.clone();
            async move {
                expected.cancel();
                if t.is_cancelled() {
                    Ok(())
                } else {
                    Err(SubscriberError::fail("foreign token"))
                }
            }
        });

        assert_eq!(n.invoke(&token).await, Ok(()));
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_others() {
        let n = Notifier::with_config(Config::named("mixed"));
        let (hits, cb) = counter();
        n.register(cb.clone());
        n.register(cb.clone());
        n.register_fn("broken", |_t: CancellationToken| async {
            Err::<(), _>(SubscriberError::fail("disk full"))
        });
        n.register(cb);

        let err = n.invoke_default().await.unwrap_err();
        let agg = err.as_aggregate().expect("aggregate");
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.failures()[0].subscriber, "broken");
        assert_eq!(agg.failures()[0].error, SubscriberError::fail("disk full"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn duplicate_policy_controls_invocation_count() {
        let allow = Notifier::new();
        let (allow_hits, cb) = counter();
        allow.register(cb.clone());
        allow.register(cb);
        allow.invoke_default().await.unwrap();
        assert_eq!(allow_hits.load(Ordering::SeqCst), 2);

        let collapse =
            Notifier::with_config(Config::default().with_duplicates(DuplicatePolicy::Collapse));
        let (collapse_hits, cb) = counter();
        let a = collapse.register(cb.clone());
        let b = collapse.register(cb);
        assert_eq!(a, b);
        collapse.invoke_default().await.unwrap();
        assert_eq!(collapse_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_callback_is_not_invoked() {
        let n = Notifier::new();
        let (hits, cb) = counter();
        let id = n.register(cb);
        assert!(n.unregister(id));
        assert!(!n.unregister(id));

        n.invoke_default().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clones_share_the_registry() {
        let n = Notifier::new();
        let other = n.clone();
        let (hits, cb) = counter();
        other.register(cb);

        n.invoke_default().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(n.len(), 1);
    }

    #[tokio::test]
    async fn dropped_owner_is_skipped_without_error() {
        let w = WeakNotifier::new();
        let live = Arc::new("live");
        let gone = Arc::new("gone");
        let (live_hits, live_cb) = counter();
        let (gone_hits, gone_cb) = counter();
        w.register(&live, live_cb);
        w.register(&gone, gone_cb);

        drop(gone);
        assert_eq!(w.invoke_default().await, Ok(()));

        assert_eq!(live_hits.load(Ordering::SeqCst), 1);
        assert_eq!(gone_hits.load(Ordering::SeqCst), 0);
        assert_eq!(w.len(), 1);
        assert!(w.contains(&live));
    }

    #[tokio::test]
    async fn weak_register_replaces_previous_callback() {
        let w = WeakNotifier::new();
        let owner = Arc::new(());
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();
        w.register(&owner, first_cb);
        w.register(&owner, second_cb);

        w.invoke_default().await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(w.unregister(&owner));
        assert!(!w.unregister(&owner));
    }

    /// Cancels the invocation token when the dispatcher schedules it.
    ///
    /// Spawn mode reads the name before spawning, so the token fires after
    /// this callback is started and before the next one is.
    struct Tripwire {
        token: CancellationToken,
        armed: AtomicBool,
        hits: Arc<AtomicUsize>,
        fails: bool,
    }

    #[async_trait]
    impl Callback<CancellationToken> for Tripwire {
        fn name(&self) -> &str {
            if self.armed.load(Ordering::SeqCst) {
                self.token.cancel();
            }
            "tripwire"
        }

        async fn call(&self, _token: CancellationToken) -> Result<(), SubscriberError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(SubscriberError::fail("tripped"))
            } else {
                Ok(())
            }
        }
    }

    async fn invoke_with_tripwire(fails: bool) -> (Result<(), InvokeError>, usize, usize) {
        let n = Notifier::with_config(Config::default().with_fan_out(FanOutMode::Spawn));
        let token = CancellationToken::new();
        let tripped = Arc::new(AtomicUsize::new(0));
        let tripwire = Arc::new(Tripwire {
            token: token.clone(),
            armed: AtomicBool::new(false),
            hits: Arc::clone(&tripped),
            fails,
        });
        n.register(tripwire.clone());
        let (later, later_cb) = counter();
        n.register(later_cb);

        tripwire.armed.store(true, Ordering::SeqCst);
        let res = n.invoke(&token).await;
        (
            res,
            tripped.load(Ordering::SeqCst),
            later.load(Ordering::SeqCst),
        )
    }

    #[tokio::test]
    async fn cancellation_mid_schedule_withholds_the_rest() {
        let (res, tripped, later) = invoke_with_tripwire(false).await;

        assert_eq!(
            res,
            Err(InvokeError::Cancelled {
                started: 1,
                skipped: 1
            })
        );
        assert_eq!(tripped, 1);
        assert_eq!(later, 0);
    }

    #[tokio::test]
    async fn failure_outranks_mid_schedule_cancellation() {
        let (res, tripped, later) = invoke_with_tripwire(true).await;

        let err = res.unwrap_err();
        let agg = err.as_aggregate().expect("aggregate");
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.failures()[0].subscriber, "tripwire");
        assert_eq!(tripped, 1);
        assert_eq!(later, 0);
    }

    #[tokio::test]
    async fn unregister_callback_removes_collapsed_subscription() {
        let n = Notifier::with_config(
            Config::named("collapse").with_duplicates(DuplicatePolicy::Collapse),
        );
        let (hits, cb) = counter();
        n.register(cb.clone());
        n.register(cb.clone());
        assert_eq!(n.len(), 1);

        assert!(n.unregister_callback(&cb));
        assert!(!n.unregister_callback(&cb));
        n.invoke_default().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutation_leaves_net_effect() {
        let n = Notifier::with_config(Config::default().with_fan_out(FanOutMode::Spawn));
        let (_, extra) = counter();
        for _ in 0..8 {
            n.register_fn("slow", |_t: CancellationToken| async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, SubscriberError>(())
            });
        }

        let invoker = {
            let n = n.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    n.invoke_default().await.unwrap();
                }
            })
        };

        let mut writers = Vec::new();
        for _ in 0..4 {
            let n = n.clone();
            let cb = extra.clone();
            writers.push(tokio::spawn(async move {
                let mut kept = Vec::new();
                for i in 0..50 {
                    let id = n.register(cb.clone());
                    if i % 2 == 0 {
                        assert!(n.unregister(id));
                    } else {
                        kept.push(id);
                    }
                    tokio::task::yield_now().await;
                }
                kept
            }));
        }

        let mut kept = Vec::new();
        for w in writers {
            kept.extend(w.await.unwrap());
        }
        invoker.await.unwrap();

        assert_eq!(n.len(), 8 + kept.len());
        assert!(kept.iter().all(|id| n.contains(*id)));
    }
}
