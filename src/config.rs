//! # Dispatcher configuration.
//!
//! Provides [`Config`], the settings shared by every dispatcher type.
//!
//! Config is fixed at construction: `Notifier::with_config(config)` and
//! friends. A dispatcher never changes its policies after it is built, so
//! concurrent invocations all observe the same behavior.

use std::borrow::Cow;

/// How the strong registry treats a callback that is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Every `register` call creates an independent subscription with its own
    /// token (list semantics). Registering the same callback twice runs it twice.
    #[default]
    Allow,
    /// Registering the same `Arc` again is a no-op that returns the token of the
    /// existing subscription (set semantics). Identity is pointer identity.
    Collapse,
}

/// How scheduled callbacks are executed during fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutMode {
    /// Each callback runs on its own tokio task (parallel on a multi-thread runtime).
    ///
    /// Requires a tokio runtime.
    #[default]
    Spawn,
    /// Callbacks are polled concurrently inside the invoking task.
    ///
    /// No extra tasks are spawned; callbacks interleave cooperatively and only
    /// make progress while the `invoke` future is polled.
    Inline,
}

/// Configuration for a dispatcher.
///
/// ## Field semantics
/// - `name`: label attached to every tracing record of this dispatcher
/// - `duplicates`: identity handling for the strong registries (ignored by weak ones)
/// - `fan_out`: execution strategy for callbacks
#[derive(Clone, Debug)]
pub struct Config {
    /// Event name used in logs.
    pub name: Cow<'static, str>,

    /// Identity handling for repeated registrations of the same callback.
    ///
    /// Weak registries always replace by owner and ignore this field.
    pub duplicates: DuplicatePolicy,

    /// Execution strategy for scheduled callbacks.
    pub fan_out: FanOutMode,
}

impl Config {
    /// Default configuration with the given event name.
    ///
    /// # Example
    /// ```
    /// use asyncfan::{Config, DuplicatePolicy};
    ///
    /// let cfg = Config::named("client-connected");
    /// assert_eq!(cfg.name, "client-connected");
    /// assert_eq!(cfg.duplicates, DuplicatePolicy::Allow);
    /// ```
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the duplicate policy.
    #[must_use]
    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Sets the fan-out mode.
    #[must_use]
    pub fn with_fan_out(mut self, fan_out: FanOutMode) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// True if repeated registrations of one `Arc` collapse into one subscription.
    #[inline]
    pub fn collapses_duplicates(&self) -> bool {
        self.duplicates == DuplicatePolicy::Collapse
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "event"`
    /// - `duplicates = DuplicatePolicy::Allow` (independent subscriptions)
    /// - `fan_out = FanOutMode::Spawn` (one tokio task per callback)
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("event"),
            duplicates: DuplicatePolicy::default(),
            fan_out: FanOutMode::default(),
        }
    }
}
