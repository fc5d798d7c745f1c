//! Error types produced by event invocation and by subscriber callbacks.
//!
//! This module defines:
//!
//! - [`SubscriberError`] - an error reported by a single callback.
//! - [`SubscriberFailure`] - a [`SubscriberError`] tagged with the callback name.
//! - [`AggregateError`] - every failure collected from one invocation.
//! - [`InvokeError`] - the outcome of a failed or cancelled invocation.
//!
//! The enums provide helper methods (`as_label`, `as_message`) for logging.

use std::fmt;

use thiserror::Error;

/// # Errors reported by a subscriber callback.
///
/// Returned from [`Callback::call`](crate::Callback::call). The dispatcher never
/// retries; it only collects these into an [`AggregateError`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    /// Callback failed with its own error.
    #[error("callback failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Callback observed the cancellation token and gave up.
    #[error("callback cancelled")]
    Canceled,

    /// Callback panicked; the panic was caught by the dispatcher.
    #[error("callback panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SubscriberError {
    /// Shorthand for [`SubscriberError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use asyncfan::SubscriberError;
    ///
    /// let err = SubscriberError::fail("socket closed");
    /// assert_eq!(err.to_string(), "callback failed: socket closed");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        SubscriberError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberError::Fail { .. } => "subscriber_failed",
            SubscriberError::Canceled => "subscriber_canceled",
            SubscriberError::Panicked { .. } => "subscriber_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SubscriberError::Fail { error } => format!("error: {error}"),
            SubscriberError::Canceled => "cancelled".to_string(),
            SubscriberError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// A single callback failure, tagged with the name of the callback that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("subscriber '{subscriber}': {error}")]
pub struct SubscriberFailure {
    /// Name of the failing callback (see [`Callback::name`](crate::Callback::name)).
    pub subscriber: String,
    /// The error it reported.
    #[source]
    pub error: SubscriberError,
}

/// # Every failure from one invocation.
///
/// Never empty when produced by the dispatcher, and never truncated:
/// each failing callback contributes exactly one [`SubscriberFailure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    failures: Vec<SubscriberFailure>,
}

impl AggregateError {
    pub(crate) fn new(failures: Vec<SubscriberFailure>) -> Self {
        debug_assert!(!failures.is_empty());
        Self { failures }
    }

    /// All collected failures, in completion order.
    pub fn failures(&self) -> &[SubscriberFailure] {
        &self.failures
    }

    /// Number of failed callbacks.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always `false` for aggregates produced by the dispatcher.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consumes the aggregate and returns the failures.
    pub fn into_failures(self) -> Vec<SubscriberFailure> {
        self.failures
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} subscriber(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// # Errors returned by an event invocation.
///
/// A caller of `invoke` observes exactly one of: `Ok(())`, a cancellation
/// variant, or [`InvokeError::Aggregate`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The cancellation token was already cancelled when `invoke` was called.
    /// No callback ran.
    #[error("cancelled before invocation")]
    PreCancelled,

    /// Cancellation was observed while callbacks were being started.
    /// Callbacks started before that point ran to completion.
    #[error("cancelled during fan-out: started={started} skipped={skipped}")]
    Cancelled {
        /// Callbacks started before cancellation was observed.
        started: usize,
        /// Callbacks withheld because of cancellation.
        skipped: usize,
    },

    /// One or more callbacks failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl InvokeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use asyncfan::InvokeError;
    ///
    /// let err = InvokeError::Cancelled { started: 1, skipped: 2 };
    /// assert_eq!(err.as_label(), "invoke_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InvokeError::PreCancelled => "invoke_pre_cancelled",
            InvokeError::Cancelled { .. } => "invoke_cancelled",
            InvokeError::Aggregate(_) => "invoke_aggregate",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            InvokeError::PreCancelled => "token cancelled before invoke".to_string(),
            InvokeError::Cancelled { started, skipped } => {
                format!("cancelled after starting {started}; skipped {skipped}")
            }
            InvokeError::Aggregate(agg) => agg.to_string(),
        }
    }

    /// True for both cancellation variants.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            InvokeError::PreCancelled | InvokeError::Cancelled { .. }
        )
    }

    /// Returns the aggregate if this is [`InvokeError::Aggregate`].
    pub fn as_aggregate(&self) -> Option<&AggregateError> {
        match self {
            InvokeError::Aggregate(agg) => Some(agg),
            _ => None,
        }
    }
}
