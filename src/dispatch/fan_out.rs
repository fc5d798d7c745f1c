//! # Fan-out invocation protocol shared by every dispatcher.
//!
//! ## Architecture
//! ```text
//! invoke(..., token)
//!     │
//!     ├─► token cancelled? ──► Err(PreCancelled)          (nothing touched)
//!     ├─► stamp token into args                          (single-argument shape)
//!     ├─► registry.snapshot()                            (lock, copy, unlock)
//!     │
//!     └─► fan_out(snapshot, input, token)
//!           ├─► empty            ──► Ok(())
//!           ├─► for each cb: token cancelled? ──► stop starting new callbacks
//!           │                    └─► start cb.call(input.clone())
//!           │                         └─► panic caught → SubscriberError::Panicked
//!           ├─► join all started callbacks
//!           └─► resolve:
//!                 failures     ──► Err(Aggregate)     (every failure kept)
//!                 skipped > 0  ──► Err(Cancelled)
//!                 otherwise    ──► Ok(())
//! ```
//!
//! ## Rules
//! - No ordering between callbacks; they run concurrently.
//! - Cancellation is cooperative: started callbacks are never aborted.
//! - The registry lock is released before any callback starts.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::callbacks::Callback;
use crate::config::FanOutMode;
use crate::error::{AggregateError, InvokeError, SubscriberError, SubscriberFailure};

/// Step 1 of every invocation: refuse a token that already fired.
pub(crate) fn ensure_not_cancelled(event: &str, token: &CancellationToken) -> Result<(), InvokeError> {
    if token.is_cancelled() {
        debug!(event, "invoke refused: token already cancelled");
        return Err(InvokeError::PreCancelled);
    }
    Ok(())
}

/// Runs every callback of `snapshot` concurrently with a clone of `input`.
pub(crate) async fn fan_out<In>(
    event: &str,
    snapshot: Vec<Arc<dyn Callback<In>>>,
    input: In,
    token: &CancellationToken,
    mode: FanOutMode,
) -> Result<(), InvokeError>
where
    In: Clone + Send + 'static,
{
    let total = snapshot.len();
    if total == 0 {
        return Ok(());
    }
    debug!(event, subscribers = total, ?mode, "invoking");

    let mut pending: FuturesUnordered<BoxFuture<'static, Option<SubscriberFailure>>> =
        FuturesUnordered::new();
    let mut started = 0usize;

    for callback in snapshot {
        if token.is_cancelled() {
            break;
        }
        pending.push(schedule(callback, input.clone(), mode));
        started += 1;
    }
    let skipped = total - started;

    let mut failures = Vec::new();
    while let Some(outcome) = pending.next().await {
        if let Some(failure) = outcome {
            warn!(
                event,
                subscriber = %failure.subscriber,
                error = failure.error.as_label(),
                detail = %failure.error.as_message(),
                "subscriber failed"
            );
            failures.push(failure);
        }
    }

    if skipped > 0 {
        debug!(event, started, skipped, "cancellation observed during fan-out");
    }
    resolve(failures, started, skipped)
}

/// Failures win over cancellation; cancellation wins over success.
fn resolve(
    failures: Vec<SubscriberFailure>,
    started: usize,
    skipped: usize,
) -> Result<(), InvokeError> {
    if !failures.is_empty() {
        return Err(AggregateError::new(failures).into());
    }
    if skipped > 0 {
        return Err(InvokeError::Cancelled { started, skipped });
    }
    Ok(())
}

/// Starts one callback according to `mode`.
///
/// In [`FanOutMode::Spawn`] the callback is running once this returns; in
/// [`FanOutMode::Inline`] it runs when the returned future is polled.
fn schedule<In>(
    callback: Arc<dyn Callback<In>>,
    input: In,
    mode: FanOutMode,
) -> BoxFuture<'static, Option<SubscriberFailure>>
where
    In: Send + 'static,
{
    match mode {
        FanOutMode::Inline => run_one(callback, input).boxed(),
        FanOutMode::Spawn => {
            let name = callback.name().to_string();
            let handle = tokio::spawn(run_one(callback, input));
            async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    // Only reachable when the runtime shuts down under us.
                    Err(join_err) => Some(SubscriberFailure {
                        subscriber: name,
                        error: if join_err.is_cancelled() {
                            SubscriberError::Canceled
                        } else {
                            SubscriberError::Panicked {
                                info: join_err.to_string(),
                            }
                        },
                    }),
                }
            }
            .boxed()
        }
    }
}

/// Runs a callback with panic isolation.
async fn run_one<In>(callback: Arc<dyn Callback<In>>, input: In) -> Option<SubscriberFailure>
where
    In: Send + 'static,
{
    let outcome = AssertUnwindSafe(callback.call(input)).catch_unwind().await;
    let error = match outcome {
        Ok(Ok(())) => return None,
        Ok(Err(err)) => err,
        Err(panic_err) => SubscriberError::Panicked {
            info: panic_message(&*panic_err),
        },
    };
    Some(SubscriberFailure {
        subscriber: callback.name().to_string(),
        error,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
