//! # asyncfan
//!
//! **asyncfan** is a small library of thread-safe asynchronous multicast events.
//!
//! Subscribers register async callbacks; a producer fires the event and every
//! subscriber runs concurrently. Cancellation is cooperative and every
//! subscriber failure is reported, none is dropped.
//!
//! ## Architecture
//! ```text
//!   producer
//!      │ register(cb) / unregister(id)             register(&owner, cb) / unregister(&owner)
//!      ▼                                                    ▼
//! ┌──────────────────────────────┐          ┌──────────────────────────────────┐
//! │ CallbackRegistry             │          │ WeakCallbackRegistry             │
//! │ SubscriptionId → callback    │          │ owner (Weak) → callback          │
//! │ (Notifier, EventHandler<A>)  │          │ (WeakNotifier, WeakEventHandler) │
//! └──────────────┬───────────────┘          └────────────────┬─────────────────┘
//!                │ snapshot (lock, copy, unlock)             │ snapshot + evict dead owners
//!                └───────────────────────┬───────────────────┘
//!                                        ▼
//!   invoke(token) ──► pre-check ──► stamp token ──► fan-out
//!                                                     ├─► cb1.call()  ┐
//!                                                     ├─► cb2.call()  ├─ concurrent
//!                                                     └─► cbN.call()  ┘
//!                                                          │
//!                                                          ▼
//!                                 Ok(()) | InvokeError::{PreCancelled, Cancelled, Aggregate}
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Dispatchers**   | Zero- and single-argument events, strong or weak registries. | [`Notifier`], [`EventHandler`], [`WeakNotifier`], [`WeakEventHandler`] |
//! | **Callbacks**     | Closures or structs implementing the callback trait.          | [`Callback`], [`CallbackFn`]                |
//! | **Event data**    | Payloads carrying the stamped cancellation token.            | [`EventArgs`], [`EventContext`], [`Sender`] |
//! | **Registries**    | Standalone thread-safe callback storage.                     | [`CallbackRegistry`], [`WeakCallbackRegistry`] |
//! | **Errors**        | Typed outcomes, aggregated subscriber failures.              | [`InvokeError`], [`AggregateError`], [`SubscriberError`] |
//! | **Configuration** | Duplicate handling, fan-out strategy, event name for logs.   | [`Config`], [`DuplicatePolicy`], [`FanOutMode`] |
//!
//! ## Logging
//! The crate emits [`tracing`] records (`trace` for registration, `debug` for
//! invocation and eviction, `warn` for subscriber failures). Install any
//! `tracing` subscriber in the host application to see them.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use asyncfan::{Config, EventContext, EventHandler, InvokeError, Sender, SubscriberError};
//!
//! struct Message { text: String }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), InvokeError> {
//!     let received: EventHandler<EventContext<Message>> =
//!         EventHandler::with_config(Config::named("message-received"));
//!
//!     received.register_fn("print", |_sender: Option<Sender>, e: Arc<EventContext<Message>>| async move {
//!         if e.is_cancelled() {
//!             return Err(SubscriberError::Canceled);
//!         }
//!         println!("new message: {}", e.text);
//!         Ok(())
//!     });
//!
//!     let token = CancellationToken::new();
//!     let args = EventContext::new(Message { text: "Hello!".into() });
//!     received.invoke(None, args, &token).await?;
//!     Ok(())
//! }
//! ```

mod callbacks;
mod config;
mod dispatch;
mod error;
mod events;
mod registry;

// ---- Public re-exports ----

pub use callbacks::{Callback, CallbackFn, EventCallback, NotifyCallback};
pub use config::{Config, DuplicatePolicy, FanOutMode};
pub use dispatch::{EventHandler, Notifier, WeakEventHandler, WeakNotifier};
pub use error::{AggregateError, InvokeError, SubscriberError, SubscriberFailure};
pub use events::{EventArgs, EventContext, EventInput, Sender};
pub use registry::{CallbackRegistry, SubscriptionId, WeakCallbackRegistry};
