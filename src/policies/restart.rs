//! # Restart policies for supervised children.
//!
//! [`Restart`] determines whether a child re-enters the registry after it
//! goes down.
//!
//! - [`Restart::Permanent`] the child is always restarted (default).
//! - [`Restart::Transient`] the child is restarted only after an abnormal
//!   exit.
//! - [`Restart::Temporary`] the child is never restarted on its own;
//!   explicit re-entry (e.g. returning a previously stopped set) may still
//!   revive it.

use crate::error::ExitReason;

/// Policy controlling whether a child is restarted after it goes down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restart {
    /// Always restart, regardless of exit reason (default).
    Permanent,
    /// Restart only after an abnormal exit.
    Transient,
    /// Never restart automatically.
    Temporary,
}

impl Default for Restart {
    /// Returns [`Restart::Permanent`].
    fn default() -> Self {
        Restart::Permanent
    }
}

impl Restart {
    /// Whether a child with this policy re-enters after exiting with
    /// `reason`.
    pub(crate) fn wants_restart(self, reason: &ExitReason) -> bool {
        match self {
            Restart::Permanent => true,
            Restart::Transient => reason.is_abnormal(),
            Restart::Temporary => false,
        }
    }
}
