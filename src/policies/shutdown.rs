//! # Shutdown policies for supervised children.
//!
//! [`ShutdownPolicy`] controls how the parent terminates a child:
//!
//! - [`ShutdownPolicy::Graceful`] cancel the child's token and wait up to
//!   the deadline for it to exit, then escalate to a forced kill.
//! - [`ShutdownPolicy::KillImmediately`] abort the child task without a
//!   graceful phase.
//! - [`ShutdownPolicy::Infinity`] cancel the token and wait indefinitely.
//!
//! The graceful deadline is measured on a monotonic clock; escalation is
//! not cancellable.

use std::time::Duration;

/// Policy controlling how a child is terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Cooperative stop with a deadline before escalating to a kill.
    ///
    /// A zero deadline kills a child that is not already finished.
    Graceful(Duration),
    /// Abort the child task unconditionally.
    KillImmediately,
    /// Cooperative stop with no deadline.
    Infinity,
}

impl Default for ShutdownPolicy {
    /// Returns a graceful stop with a 5 second deadline.
    fn default() -> Self {
        ShutdownPolicy::Graceful(Duration::from_millis(5000))
    }
}
