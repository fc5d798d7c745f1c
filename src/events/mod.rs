//! Event payloads delivered to single-argument callbacks.
//!
//! ## Contents
//! - [`EventArgs`] payload contract with the write-once cancellation field
//! - [`EventContext`] generic payload wrapper
//! - [`EventInput`], [`Sender`] what a single-argument callback receives

mod args;

pub use args::{EventArgs, EventContext, EventInput, Sender};
